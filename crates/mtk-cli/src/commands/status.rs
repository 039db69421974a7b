use crate::cli::Cli;

pub fn run(cli: &Cli, json: bool) -> anyhow::Result<()> {
    let toolkit = super::load_toolkit(cli)?;
    let status = toolkit.registry.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", status.render_text());
    }

    toolkit.registry.shutdown();
    Ok(())
}
