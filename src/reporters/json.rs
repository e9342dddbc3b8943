//! JSON reporter
//!
//! Outputs the full DemoRun (data, annotator labels, parameters,
//! predictions, metrics) as pretty-printed JSON.

use crate::pipeline::DemoRun;
use anyhow::Result;

/// Render run as JSON
pub fn render(run: &DemoRun) -> Result<String> {
    Ok(serde_json::to_string_pretty(run)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_run;

    #[test]
    fn test_json_render_valid() {
        let run = test_run();
        let json_str = render(&run).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["model"], "passive-crowd");
        assert_eq!(parsed["predictions"].as_array().expect("predictions").len(), 24);
        assert_eq!(
            parsed["data"]["annotator_labels"].as_array().expect("labels").len(),
            6
        );
        assert_eq!(parsed["outcome"]["params"]["w"][0].as_array().expect("w row").len(), 2);
        assert_eq!(parsed["data"]["profiles"][0]["kind"], "reliable_on_positives");
    }

    #[test]
    fn test_json_reloads_as_run() {
        let run = test_run();
        let json_str = render(&run).expect("render JSON");
        let back: DemoRun = serde_json::from_str(&json_str).expect("reload");
        assert_eq!(back.predictions, run.predictions);
        assert_eq!(back.data.annotator_labels, run.data.annotator_labels);
    }
}
