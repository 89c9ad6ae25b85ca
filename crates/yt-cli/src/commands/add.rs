//! Add command for creating timers.

use std::io::Write;

use anyhow::Result;
use yt_core::Timer;
use yt_storage::Storage;

pub fn run<W: Write>(
    writer: &mut W,
    storage: &Storage,
    title: &str,
    description: &str,
    source: &str,
) -> Result<()> {
    if title.trim().is_empty() {
        anyhow::bail!("timer title cannot be empty");
    }
    let mut data = storage.load_data()?;
    if data.timer(title).is_some() {
        anyhow::bail!("a timer named {title:?} already exists");
    }

    data.timerdata.push(Timer::new(title, description, source));
    storage.save_data(&data)?;
    writeln!(writer, "Added timer {title} ({source})")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_timer_with_fields() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        let mut out = Vec::new();
        run(&mut out, &storage, "COE-1", "Login bug", "jira").unwrap();

        let data = storage.load_data().unwrap();
        let timer = data.timer("COE-1").unwrap();
        assert_eq!(timer.description, "Login bug");
        assert_eq!(timer.source_system, "jira");
        assert_eq!(String::from_utf8(out).unwrap(), "Added timer COE-1 (jira)\n");
    }

    #[test]
    fn rejects_duplicate_and_blank_titles() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        let mut out = Vec::new();
        run(&mut out, &storage, "COE-1", "", "yt").unwrap();
        assert!(run(&mut out, &storage, "COE-1", "again", "yt").is_err());
        assert!(run(&mut out, &storage, "  ", "", "yt").is_err());
        assert_eq!(storage.load_data().unwrap().timerdata.len(), 1);
    }
}
