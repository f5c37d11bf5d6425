//! CLI engine against stand-in synthesizer and player scripts
#![cfg(unix)]

use signvox_audio::{Backend, CliEngineConfig, CliSpeechEngine};
use signvox_core::{
    playback_channel, PlaybackEvent, PlaybackEventReceiver, PlaybackRequest, SpeechEngine,
    UtteranceId,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::time::{sleep, timeout, Duration};

/// Fake espeak-ng: sleeps, then writes a tiny WAV to the `-w` argument if given.
const SYNTH: &str = r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-w" ]; then out="$2"; shift; fi
  shift
done
sleep __DELAY__
if [ -n "$out" ]; then printf 'RIFF' > "$out"; fi
"#;

/// Fake player: records the file it was given, optionally lingers, then leaves a marker.
const PLAYER: &str = r#"#!/bin/sh
echo "$1" > "__DIR__/played_path"
sleep __DELAY__
touch "__DIR__/played"
"#;

struct Fixture {
    dir: PathBuf,
}

impl Fixture {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "signvox_{name}_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.join(name);
        std::fs::write(&path, body.replace("__DIR__", &self.dir.to_string_lossy())).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn config(&self, synth_delay: &str, player_delay: &str, timeout_ms: u64) -> CliEngineConfig {
        let synth = self.script("synth.sh", &SYNTH.replace("__DELAY__", synth_delay));
        let player = self.script("player.sh", &PLAYER.replace("__DELAY__", player_delay));
        let mut cfg = CliEngineConfig::console();
        cfg.temp_dir = self.dir.clone();
        cfg.timeout_ms = timeout_ms;
        cfg.espeak_bin = Some(synth);
        cfg.player = Some(player.to_string_lossy().to_string());
        cfg
    }

    fn played(&self) -> bool {
        self.dir.join("played").exists()
    }

    fn played_path(&self) -> Option<PathBuf> {
        std::fs::read_to_string(self.dir.join("played_path"))
            .ok()
            .map(|s| PathBuf::from(s.trim()))
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn request(text: &str) -> PlaybackRequest {
    PlaybackRequest {
        text: text.to_string(),
        voice: None,
        rate: 1.0,
        pitch: 1.0,
        volume: 1.0,
    }
}

async fn next_event(rx: &mut PlaybackEventReceiver, within: Duration) -> PlaybackEvent {
    timeout(within, rx.recv())
        .await
        .expect("no playback event in time")
        .expect("event channel closed")
}

async fn wait_for_file(path: &Path, within: Duration) -> bool {
    timeout(within, async {
        while !path.exists() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn test_plays_synthesized_wav_and_cleans_up() {
    let fx = Fixture::new("plays");
    let (tx, mut rx) = playback_channel();
    let engine = CliSpeechEngine::new(fx.config("0", "0", 5_000), tx);
    assert_eq!(engine.backend(), Backend::Espeak);

    engine.submit(UtteranceId(1), request("hello")).unwrap();
    assert_eq!(
        next_event(&mut rx, Duration::from_secs(2)).await,
        PlaybackEvent::Started { id: UtteranceId(1) }
    );
    assert_eq!(
        next_event(&mut rx, Duration::from_secs(5)).await,
        PlaybackEvent::Completed { id: UtteranceId(1) }
    );

    assert!(fx.played());
    let wav = fx.played_path().unwrap();
    assert!(wav.starts_with(&fx.dir));
    assert!(!wav.exists());
}

#[tokio::test]
async fn test_pause_before_playback_holds_the_player() {
    let fx = Fixture::new("pause_early");
    let (tx, mut rx) = playback_channel();
    let engine = CliSpeechEngine::new(fx.config("0.2", "0", 5_000), tx);

    engine.submit(UtteranceId(1), request("hello")).unwrap();
    engine.pause();

    sleep(Duration::from_secs(1)).await;
    assert!(!fx.played());

    engine.resume();
    assert!(wait_for_file(&fx.dir.join("played"), Duration::from_secs(5)).await);
    assert_eq!(
        next_event(&mut rx, Duration::from_secs(1)).await,
        PlaybackEvent::Started { id: UtteranceId(1) }
    );
    assert_eq!(
        next_event(&mut rx, Duration::from_secs(5)).await,
        PlaybackEvent::Completed { id: UtteranceId(1) }
    );
}

#[tokio::test]
async fn test_pause_during_synthesis_outlasts_timeout() {
    let fx = Fixture::new("pause_long");
    let (tx, mut rx) = playback_channel();
    let engine = CliSpeechEngine::new(fx.config("0.6", "0", 1_000), tx);

    engine.submit(UtteranceId(1), request("hello")).unwrap();
    assert_eq!(
        next_event(&mut rx, Duration::from_secs(1)).await,
        PlaybackEvent::Started { id: UtteranceId(1) }
    );

    sleep(Duration::from_millis(150)).await;
    engine.pause();
    sleep(Duration::from_millis(1_300)).await;
    assert!(rx.try_recv().is_err());
    assert!(!fx.played());

    engine.resume();
    assert_eq!(
        next_event(&mut rx, Duration::from_secs(5)).await,
        PlaybackEvent::Completed { id: UtteranceId(1) }
    );
    assert!(fx.played());
}

#[tokio::test]
async fn test_pause_suspends_running_player() {
    let fx = Fixture::new("pause_player");
    let (tx, mut rx) = playback_channel();
    let engine = CliSpeechEngine::new(fx.config("0", "0.5", 5_000), tx);

    engine.submit(UtteranceId(1), request("hello")).unwrap();
    assert!(wait_for_file(&fx.dir.join("played_path"), Duration::from_secs(2)).await);
    engine.pause();

    sleep(Duration::from_secs(1)).await;
    assert!(!fx.played());

    engine.resume();
    assert!(wait_for_file(&fx.dir.join("played"), Duration::from_secs(5)).await);
    let _started = next_event(&mut rx, Duration::from_secs(1)).await;
    assert_eq!(
        next_event(&mut rx, Duration::from_secs(5)).await,
        PlaybackEvent::Completed { id: UtteranceId(1) }
    );
}

#[tokio::test]
async fn test_cancel_kills_player_and_removes_wav() {
    let fx = Fixture::new("cancel");
    let (tx, mut rx) = playback_channel();
    let engine = CliSpeechEngine::new(fx.config("0", "0.5", 5_000), tx);

    engine.submit(UtteranceId(1), request("hello")).unwrap();
    assert!(wait_for_file(&fx.dir.join("played_path"), Duration::from_secs(2)).await);
    let wav = fx.played_path().unwrap();

    engine.cancel_all();
    sleep(Duration::from_secs(1)).await;

    assert!(!fx.played());
    assert!(!wav.exists());
    // Started only; aborted playback reports nothing further
    assert_eq!(
        next_event(&mut rx, Duration::from_secs(1)).await,
        PlaybackEvent::Started { id: UtteranceId(1) }
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_cancel_while_paused_still_kills() {
    let fx = Fixture::new("cancel_paused");
    let (tx, _rx) = playback_channel();
    let engine = CliSpeechEngine::new(fx.config("0", "0.3", 5_000), tx);

    engine.submit(UtteranceId(1), request("hello")).unwrap();
    assert!(wait_for_file(&fx.dir.join("played_path"), Duration::from_secs(2)).await);
    engine.pause();
    engine.cancel_all();
    // Resuming after cancel has nothing to act on
    engine.resume();

    sleep(Duration::from_secs(1)).await;
    assert!(!fx.played());
}

#[tokio::test]
async fn test_hung_synthesizer_times_out() {
    let fx = Fixture::new("timeout");
    let (tx, mut rx) = playback_channel();
    let engine = CliSpeechEngine::new(fx.config("5", "0", 300), tx);

    engine.submit(UtteranceId(4), request("hello")).unwrap();
    let _started = next_event(&mut rx, Duration::from_secs(1)).await;
    match next_event(&mut rx, Duration::from_secs(3)).await {
        PlaybackEvent::Failed { id, reason } => {
            assert_eq!(id, UtteranceId(4));
            assert!(reason.contains("timed out"), "{reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!fx.played());
}

#[tokio::test]
async fn test_render_returns_wav_bytes() {
    let fx = Fixture::new("render");
    let (tx, _rx) = playback_channel();
    let engine = CliSpeechEngine::new(fx.config("0", "0", 5_000), tx);

    let bytes = engine.render(request("hello")).await.unwrap();
    assert_eq!(bytes, b"RIFF");
    assert!(!fx.played());
}
