//! Host platform utility functions

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Name of the environment variable pointing at the root of the software checkout.
pub const SW_ROOT_ENV_VAR: &str = "ROVER_SW_ROOT";

/// Get the software root directory from the `ROVER_SW_ROOT` environment variable.
///
/// Parameter files and session directories are resolved relative to this path.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Return true if any thread of any process under `proc_root` (normally `/proc`) is named
/// `thread_name`.
///
/// Processes which exit during the scan are skipped.
pub fn thread_running<P: AsRef<Path>>(proc_root: P, thread_name: &str) -> io::Result<bool> {
    for entry in fs::read_dir(proc_root)? {
        let pid_dir = match entry {
            Ok(e) => e.path(),
            Err(_) => continue,
        };

        let is_pid = pid_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false);
        if !is_pid {
            continue;
        }

        let tasks = match fs::read_dir(pid_dir.join("task")) {
            Ok(t) => t,
            Err(_) => continue,
        };

        for task in tasks.flatten() {
            if let Ok(comm) = fs::read_to_string(task.path().join("comm")) {
                if comm.trim_end() == thread_name {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}

#[cfg(test)]
mod test {
    use super::*;

    fn fake_proc(name: &str, threads: &[(&str, &str, &str)]) -> PathBuf {
        let root = std::env::temp_dir().join(format!("util_proc_{}_{}", name, std::process::id()));
        fs::remove_dir_all(&root).ok();
        fs::create_dir_all(root.join("self")).unwrap();
        fs::write(root.join("uptime"), "1.0 1.0\n").unwrap();

        for (pid, tid, comm) in threads {
            let task = root.join(pid).join("task").join(tid);
            fs::create_dir_all(&task).unwrap();
            fs::write(task.join("comm"), format!("{}\n", comm)).unwrap();
        }

        root
    }

    #[test]
    fn test_thread_found_in_any_process() {
        let root = fake_proc(
            "found",
            &[("1", "1", "systemd"), ("812", "812", "arducopter"), ("812", "815", "ap-timer")],
        );

        assert!(thread_running(&root, "ap-timer").unwrap());
        assert!(!thread_running(&root, "ap-rcin").unwrap());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_missing_proc_root_is_error() {
        let root = std::env::temp_dir().join(format!("util_proc_none_{}", std::process::id()));
        fs::remove_dir_all(&root).ok();

        assert!(thread_running(&root, "ap-timer").is_err());
    }
}
