use std::path::Path;

use mashup_delivery::EmailConfig;
use mashup_media::{check_ffmpeg, check_ffprobe, check_ytdlp};
use mashup_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "mashup-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;

    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    println!("mashup-selfcheck: ffmpeg at {}", ffmpeg.display());

    match check_ffprobe() {
        Ok(path) => println!("mashup-selfcheck: ffprobe at {}", path.display()),
        Err(_) => println!("mashup-selfcheck: warning: ffprobe missing, downloads are not probed"),
    }

    let ytdlp = check_ytdlp(&config.source.ytdlp_path)
        .map_err(|e| anyhow::anyhow!("{} not available: {}", config.source.ytdlp_path, e))?;
    println!("mashup-selfcheck: yt-dlp at {}", ytdlp.display());

    if let Some(cookies) = &config.source.cookies_file {
        if !cookies.exists() {
            return Err(anyhow::anyhow!(
                "YTDLP_COOKIES_FILE points to missing file {}",
                cookies.display()
            ));
        }
    }

    if !EmailConfig::from_env().is_configured() {
        println!("mashup-selfcheck: warning: EMAIL_ADDRESS/EMAIL_PASSWORD not set, email delivery disabled");
    }

    println!("mashup-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = tempfile::tempfile_in(path)
        .map_err(|e| anyhow::anyhow!("work dir {} is not writable: {}", path.display(), e))?;
    drop(probe);
    Ok(())
}
