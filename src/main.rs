//! Daemon entrypoint: load config and persisted state, bring up the
//! matrix reconciler and HTTP ingress, run until asked to stop, persist
//! on the way out.

use std::io::Write as _;
use std::sync::Arc;

use multiviewer::config::Config;
use multiviewer::matrix::manager::MatrixManager;
use multiviewer::orchestrator::Multiviewer;

fn acquire_singleton_lock() -> std::io::Result<std::fs::File> {
    let path = std::env::temp_dir().join("multiviewerd.lock");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&path)?;

    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "another multiviewerd instance holds the lock",
            ));
        }
    }

    Ok(file)
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let _lock = match acquire_singleton_lock() {
        Ok(file) => file,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let config = Config::load();
    config.save();
    log::info!(
        "multiviewerd starting: matrix={}:{} ir_bridge={}:{} http={}:{}",
        config.matrix_host,
        config.matrix_port,
        config.ir_bridge_host,
        config.ir_bridge_port,
        config.http_host,
        config.http_port
    );

    let matrix = Arc::new(MatrixManager::new());
    tokio::spawn(Arc::clone(&matrix).run(config.clone()));

    let mv = Arc::new(Multiviewer::new(&config, Arc::clone(&matrix)));
    mv.sync_matrix_to_current_state().await;

    if let Err(e) = multiviewer::http::spawn(&config, Arc::clone(&mv)) {
        log::error!("failed to start http ingress: {e}");
        std::process::exit(1);
    }

    wait_for_shutdown_signal().await;
    log::info!("multiviewerd shutting down");
    mv.shutdown().await;
    let _ = std::io::stdout().flush();
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    tokio::select! {
        _ = term.recv() => log::info!("received SIGTERM"),
        _ = int.recv() => log::info!("received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    log::info!("received ctrl-c");
}
