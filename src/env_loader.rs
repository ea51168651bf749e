use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(
    digest_home: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    match digest_home {
        Some(home) => Some(home.join(".env")),
        None => Some(config_dir?.join("thread-digest/.env")),
    }
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("THREAD_DIGEST_HOME").map(PathBuf::from),
        dirs::config_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}
