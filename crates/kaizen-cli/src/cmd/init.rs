use anyhow::Context;
use kaizen_core::{config::Config, io, paths};
use std::path::Path;

const DIRECTORY_TEMPLATE: &str = "\
# Employees and plants referenced by opportunities.
#
# employees:
#   - id: e1
#     employee_code: EMP-001
#     name: Asha Rao
#     email: asha@example.com
#     plant: Pune
#     role: employee        # ci_head | admin | hod | project_leader | lof | cs_head | employee
# plants:
#   - id: pune
#     name: Pune
#     plant_code: \"1001\"
#     roles: { ci_head: e7, hod: e8, lof: e9, cs_head: e10 }
employees: []
plants: []
";

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing kaizen in: {}", root.display());

    for dir in [paths::KAIZEN_DIR, paths::UPLOADS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    let written = io::write_if_missing(
        &paths::directory_path(root),
        DIRECTORY_TEMPLATE.as_bytes(),
    )
    .context("failed to write directory.yaml")?;
    if written {
        println!("  created: {}", paths::DIRECTORY_FILE);
    } else {
        println!("  exists:  {}", paths::DIRECTORY_FILE);
    }

    io::ensure_gitignore_entry(root, paths::DB_FILE)?;
    io::ensure_gitignore_entry(root, paths::UPLOADS_DIR)?;

    println!("\nkaizen initialized. Fill in {} next.", paths::DIRECTORY_FILE);
    Ok(())
}
