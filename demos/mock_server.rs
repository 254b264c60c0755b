//! # Mock Server Example
//!
//! Showcases a [`ReelServer`] in front of a [`ScriptedBackend`]: every job replays a fixed
//! script with a short pause between events, so a client can be exercised end to end
//! without any media tooling installed.
//!
//! ## Usage
//!
//! ```sh
//! cargo run --example mock_server --features "server mock"
//! REEL_BACKEND_URL=http://localhost:8000 reel video https://youtu.be/abc
//! ```

use reel::prelude::*;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let artifact_dir = env::temp_dir().join("reel_mock");
    std::fs::create_dir_all(&artifact_dir).unwrap();
    std::fs::write(artifact_dir.join("x.mp4"), b"mock video").unwrap();
    std::fs::write(artifact_dir.join("song.mp3"), b"mock audio").unwrap();
    std::fs::write(artifact_dir.join("screenshots.zip"), b"mock archive").unwrap();

    let shot = |n: usize| format!("/tmp/shot_{n:03}.png");

    // Don't use this in production! Nothing here touches a real video.
    let backend = ScriptedBackend::new()
        .with_delay(Duration::from_millis(300))
        .with_video_info(
            "https://youtu.be/abc",
            VideoInfo {
                title: Some("Example".to_string()),
                thumbnail: Some("https://i.ytimg.com/vi/abc/hqdefault.jpg".to_string()),
                video_resolutions: vec!["1080p (Full HD)".to_string(), "720p (HD)".to_string()],
                image_resolutions: vec!["Best available".to_string(), "720p".to_string()],
            },
        )
        .with_script(
            JobKind::Video,
            vec![
                JobEvent::progress(5.0, "Downloading video..."),
                JobEvent::progress(50.0, "Merging streams..."),
                JobEvent {
                    video_file: Some(artifact_dir.join("x.mp4").display().to_string()),
                    ..JobEvent::completed("/api/download/x.mp4")
                },
            ],
        )
        .with_script(
            JobKind::Audio,
            vec![
                JobEvent::progress(10.0, "Downloading audio..."),
                JobEvent {
                    audio_file: Some(artifact_dir.join("song.mp3").display().to_string()),
                    ..JobEvent::completed("/api/download/song.mp3")
                },
            ],
        )
        .with_script(
            JobKind::Screenshots,
            vec![
                JobEvent {
                    images: vec![shot(1)],
                    ..JobEvent::progress(30.0, "Captured 1 screenshot")
                },
                JobEvent {
                    images: vec![shot(1), shot(2)],
                    ..JobEvent::progress(60.0, "Captured 2 screenshots")
                },
                JobEvent {
                    images: vec![shot(1), shot(2), shot(3)],
                    zip_file: Some("screenshots.zip".to_string()),
                    ..JobEvent::completed("/api/download/screenshots.zip")
                },
            ],
        );

    backend.init().await.unwrap();

    // Build App
    let app = ReelServer::new(ReelServerConfig {
        artifact_dir,
        ..Default::default()
    })
    .build(backend);

    // Serve
    let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = format!("0.0.0.0:{port}");
    println!("Server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
