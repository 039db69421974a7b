use mtk_core::{ConfigStore, ToolkitConfig};

pub fn init(store: &ConfigStore, force: bool) -> anyhow::Result<()> {
    if store.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            store.path().display()
        );
    }
    store.save(&ToolkitConfig::stock())?;
    println!("Wrote {}", store.path().display());
    Ok(())
}

pub fn show(store: &ConfigStore) -> anyhow::Result<()> {
    let config = store.try_load()?;
    eprintln!("# {}", store.path().display());
    print!("{}", config.render(store.path())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.yaml"));
        init(&store, false).unwrap();
        assert!(init(&store, false).is_err());
        init(&store, true).unwrap();
        assert_eq!(store.try_load().unwrap(), ToolkitConfig::stock());
    }
}
