use crate::cli::Cli;
use mtk_host::{CallContext, OperationOutput};

pub async fn run(cli: &Cli, operation: &str, args: &str) -> anyhow::Result<()> {
    let args = parse_args(args)?;
    let toolkit = super::load_toolkit(cli)?;

    let ctx = CallContext::default();
    let result = toolkit.server.call(operation, args, &ctx).await;
    toolkit.registry.shutdown();

    let output = result.map_err(|e| anyhow::anyhow!("{operation}: {e}"))?;
    print_output(&output);
    if output.is_error {
        anyhow::bail!("{operation} reported an error");
    }
    Ok(())
}

fn parse_args(raw: &str) -> anyhow::Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("--args is not valid JSON: {e}"))?;
    if !value.is_object() {
        anyhow::bail!("--args must be a JSON object");
    }
    Ok(value)
}

fn print_output(output: &OperationOutput) {
    if output.is_error {
        eprintln!("{}", output.output);
    } else {
        println!("{}", output.output);
    }
}

#[cfg(test)]
mod tests {
    use super::parse_args;

    #[test]
    fn test_parse_args_object() {
        let value = parse_args(r#"{"path": "a.txt"}"#).unwrap();
        assert_eq!(value["path"], "a.txt");
    }

    #[test]
    fn test_parse_args_rejects_non_objects() {
        assert!(parse_args("[1, 2]").is_err());
        assert!(parse_args("not json").is_err());
    }
}
