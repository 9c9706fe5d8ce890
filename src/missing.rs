use console::style;
use std::path::Path;

/// Styled notice for a repository configured here but absent on this machine.
pub fn missing_repo_notice(path: &Path) -> String {
    format!(
        "{}\n  {}",
        style(path.display()).dim(),
        style("not present on this machine; skipped by check and pull").yellow()
    )
}

pub fn print_missing_repo(path: &Path) {
    println!("{}", missing_repo_notice(path));
}
