//! Stop command - stops the genwatch daemon

use super::start::read_pid;
use tracing::info;

pub async fn run() -> anyhow::Result<()> {
    let Some(pid) = read_pid() else {
        println!("genwatch is not running");
        return Ok(());
    };

    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        println!("Could not signal genwatch (PID {}): {}", pid, err);
        return Ok(());
    }

    info!("Sent SIGTERM to genwatch (PID {})", pid);
    Ok(())
}
