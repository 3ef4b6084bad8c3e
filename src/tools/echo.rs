//! CN-014: The echo tool.

use crate::core::context::StepContext;
use crate::core::types::StepResult;

pub fn execute(message: &str, ctx: &StepContext) -> Result<StepResult, String> {
    let rendered = ctx.render(message)?;
    println!("{}", rendered);

    let mut result = StepResult::new("", "echo");
    result.output = Some(rendered.clone());
    result.messages.push(rendered);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cn014_renders_message() {
        let mut ctx = StepContext::new(PathBuf::from("/p"), false, false);
        ctx.variables.insert(
            "name".to_string(),
            serde_yaml_ng::Value::String("Widget".to_string()),
        );
        let r = execute("generated {{name}}", &ctx).unwrap();
        assert_eq!(r.output.as_deref(), Some("generated Widget"));
    }

    #[test]
    fn test_cn014_unknown_variable() {
        let ctx = StepContext::new(PathBuf::from("/p"), false, false);
        assert!(execute("{{missing}}", &ctx).is_err());
    }
}
