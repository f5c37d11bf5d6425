//! Speech engine backed by local command-line synthesizers
//!
//! Backends, in order of preference:
//! - Piper (higher quality, requires a voice model)
//! - espeak-ng (widely available)
//! - console: no synthesizer found, utterances are logged and complete immediately
//!
//! Synthesis writes a temporary WAV which is then played with aplay, paplay or ffplay.
//! espeak-ng speaks directly when no player is installed.
//!
//! Env overrides:
//! - PIPER_BIN, PIPER_VOICE, PIPER_VOICE_DIR
//! - ESPEAK_BIN
//! - TTS_PLAYER, TTS_TIMEOUT_MS, TTS_TEMP_DIR

use crate::utils::{get_from_env_or_path, get_from_path, TempWav};
use crate::voices::{console_voice, parse_espeak_voices, piper_voices};
use crate::wav::scale_pcm16;
use async_trait::async_trait;
use signvox_core::{
    PlaybackEvent, PlaybackEventSender, PlaybackRequest, Result, SpeechEngine, SpeechError,
    UtteranceId, VoiceDescriptor,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct CliEngineConfig {
    pub temp_dir: PathBuf,
    /// Bound on synthesis and voice enumeration. Playback itself is not bounded.
    pub timeout_ms: u64,
    pub sample_rate: u32,
    pub piper_bin: Option<PathBuf>,
    pub piper_voice: Option<PathBuf>,
    pub piper_voice_dir: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
    /// Preferred player name (aplay|paplay|ffplay)
    pub player: Option<String>,
}

impl Default for CliEngineConfig {
    fn default() -> Self {
        let temp_dir = std::env::var("TTS_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());
        let timeout_ms = std::env::var("TTS_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(20_000);

        let piper_bin = get_from_env_or_path("PIPER_BIN", "piper");
        let piper_voice = std::env::var("PIPER_VOICE").ok().map(PathBuf::from);
        let piper_voice_dir = std::env::var("PIPER_VOICE_DIR").ok().map(PathBuf::from);
        let espeak_bin =
            get_from_env_or_path("ESPEAK_BIN", "espeak-ng").or_else(|| get_from_path("espeak"));

        Self {
            temp_dir,
            timeout_ms,
            sample_rate: 16_000,
            piper_bin,
            piper_voice,
            piper_voice_dir,
            espeak_bin,
            player: std::env::var("TTS_PLAYER").ok(),
        }
    }
}

impl CliEngineConfig {
    /// Config with no synthesizer at all; every utterance goes to the log.
    pub fn console() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            timeout_ms: 20_000,
            sample_rate: 16_000,
            piper_bin: None,
            piper_voice: None,
            piper_voice_dir: None,
            espeak_bin: None,
            player: None,
        }
    }

    pub fn backend(&self) -> Backend {
        let has_model = self.piper_voice.is_some() || self.piper_voice_dir.is_some();
        if self.piper_bin.is_some() && has_model {
            Backend::Piper
        } else if self.espeak_bin.is_some() {
            Backend::Espeak
        } else {
            Backend::Console
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Piper,
    Espeak,
    Console,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Piper => "piper",
            Backend::Espeak => "espeak-ng",
            Backend::Console => "console",
        }
    }
}

struct ActiveJob {
    id: UtteranceId,
    task: JoinHandle<()>,
    control: Arc<JobControl>,
}

#[derive(Default)]
struct ChildState {
    /// Pid of the synthesizer or player currently running, 0 when none
    pid: u32,
    paused: bool,
}

/// Pause state of one playback job, shared by the engine and the job's task.
///
/// The flag outlives individual child processes: a child spawned while the
/// job is paused is not started until resume, and one that races the pause
/// is stopped as soon as its pid is known.
struct JobControl {
    state: Mutex<ChildState>,
    paused: watch::Sender<bool>,
}

impl JobControl {
    fn new() -> Self {
        Self {
            state: Mutex::new(ChildState::default()),
            paused: watch::channel(false).0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChildState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_paused(&self, paused: bool) {
        let mut state = self.lock();
        if state.paused == paused {
            return;
        }
        state.paused = paused;
        self.paused.send_replace(paused);
        let signal = if paused { "STOP" } else { "CONT" };
        if state.pid == 0 {
            debug!(target: "tts", signal, "No child running; applies to the next one");
        } else {
            signal_process(state.pid, signal);
        }
    }

    fn attach(&self, pid: u32) {
        let mut state = self.lock();
        state.pid = pid;
        if state.paused && pid != 0 {
            signal_process(pid, "STOP");
        }
    }

    fn detach(&self) {
        self.lock().pid = 0;
    }

    async fn wait_until_resumed(&self) {
        let mut rx = self.paused.subscribe();
        let _ = rx.wait_for(|paused| !*paused).await;
    }
}

pub struct CliSpeechEngine {
    cfg: CliEngineConfig,
    backend: Backend,
    player: Option<PathBuf>,
    events: PlaybackEventSender,
    active: Mutex<Option<ActiveJob>>,
}

impl CliSpeechEngine {
    pub fn new(cfg: CliEngineConfig, events: PlaybackEventSender) -> Self {
        let backend = cfg.backend();
        let player = select_player(cfg.player.as_deref());
        // Log detected engines once
        if let Some(ref p) = cfg.piper_bin {
            info!(target: "tts", bin = ?p, "Detected Piper binary");
        }
        if let Some(ref e) = cfg.espeak_bin {
            info!(target: "tts", bin = ?e, "Detected espeak-ng binary");
        }
        match (&player, backend) {
            (_, Backend::Console) => warn!(
                target: "tts",
                "No TTS engine detected (Piper/espeak-ng missing). Printing only."
            ),
            (None, Backend::Piper) => {
                warn!(target: "tts", "No audio player found (aplay/paplay/ffplay); Piper output cannot be played")
            }
            (Some(p), _) => info!(target: "tts", player = ?p, backend = backend.as_str(), "Speech engine ready"),
            (None, Backend::Espeak) => {
                info!(target: "tts", "No audio player found; espeak-ng will speak directly")
            }
        }
        Self {
            cfg,
            backend,
            player,
            events,
            active: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    fn job(&self) -> Job {
        Job {
            cfg: self.cfg.clone(),
            backend: self.backend,
            player: self.player.clone(),
            control: Arc::new(JobControl::new()),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveJob>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_paused(&self, paused: bool) {
        match self.active().as_ref() {
            Some(job) if !job.task.is_finished() => job.control.set_paused(paused),
            _ => debug!(target: "tts", paused, "No playback in progress"),
        }
    }
}

#[async_trait]
impl SpeechEngine for CliSpeechEngine {
    fn name(&self) -> String {
        self.backend.as_str().to_string()
    }

    async fn voices(&self) -> Result<Vec<VoiceDescriptor>> {
        match self.backend {
            Backend::Piper => Ok(piper_voices(
                self.cfg.piper_voice_dir.as_deref(),
                self.cfg.piper_voice.as_deref(),
            )),
            Backend::Espeak => {
                let bin = self
                    .cfg
                    .espeak_bin
                    .as_ref()
                    .ok_or_else(|| SpeechError::Engine("espeak-ng not found".into()))?;
                let mut cmd = Command::new(bin);
                cmd.arg("--voices").kill_on_drop(true);
                let output = timeout(self.cfg.timeout(), cmd.output())
                    .await
                    .map_err(|_| SpeechError::Engine("espeak-ng --voices timed out".into()))??;
                if !output.status.success() {
                    return Err(SpeechError::Engine(format!(
                        "espeak-ng --voices failed: {}",
                        String::from_utf8_lossy(&output.stderr)
                    )));
                }
                Ok(parse_espeak_voices(&String::from_utf8_lossy(&output.stdout)))
            }
            Backend::Console => Ok(vec![console_voice()]),
        }
    }

    fn submit(&self, id: UtteranceId, request: PlaybackRequest) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SpeechError::Engine(format!("no async runtime for playback: {e}")))?;

        let job = self.job();
        let control = Arc::clone(&job.control);
        let events = self.events.clone();
        let task = runtime.spawn(async move {
            let _ = events.send(PlaybackEvent::Started { id });
            let event = match job.speak(&request).await {
                Ok(()) => PlaybackEvent::Completed { id },
                Err(e) => {
                    warn!(target: "tts", %id, error = %e, "Playback failed");
                    PlaybackEvent::Failed {
                        id,
                        reason: e.to_string(),
                    }
                }
            };
            let _ = events.send(event);
        });

        let mut active = self.active();
        if let Some(prev) = active.replace(ActiveJob { id, task, control }) {
            if !prev.task.is_finished() {
                warn!(target: "tts", previous = %prev.id, %id, "Submit while busy; aborting previous playback");
                prev.task.abort();
            }
        }
        Ok(())
    }

    fn cancel_all(&self) {
        if let Some(job) = self.active().take() {
            debug!(target: "tts", id = %job.id, "Cancelling playback");
            // Dropping the task future kills its child process
            job.task.abort();
        }
    }

    fn pause(&self) {
        self.set_paused(true);
    }

    fn resume(&self) {
        self.set_paused(false);
    }

    async fn render(&self, request: PlaybackRequest) -> Result<Vec<u8>> {
        if self.backend == Backend::Console {
            return Err(SpeechError::Unsupported(
                "no synthesizer installed; cannot render audio".into(),
            ));
        }
        let job = self.job();
        let wav = TempWav::new(&self.cfg.temp_dir);
        job.synthesize(&request, wav.path()).await?;
        Ok(tokio::fs::read(wav.path()).await?)
    }
}

impl CliEngineConfig {
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Everything one playback task needs, detached from the engine
struct Job {
    cfg: CliEngineConfig,
    backend: Backend,
    player: Option<PathBuf>,
    control: Arc<JobControl>,
}

impl Job {
    async fn speak(&self, request: &PlaybackRequest) -> Result<()> {
        match (self.backend, &self.player) {
            (Backend::Console, _) => {
                info!(target: "tts", text = %request.text, voice = ?request.voice.as_ref().map(|v| &v.name), "Speaking (console)");
                Ok(())
            }
            (Backend::Espeak, None) => {
                let cmd = self.espeak_command(request, None)?;
                self.run(cmd, None, None).await
            }
            (_, Some(player)) => {
                let wav = TempWav::new(&self.cfg.temp_dir);
                self.synthesize(request, wav.path()).await?;
                self.run(player_command(player, wav.path()), None, None)
                    .await
            }
            (Backend::Piper, None) => Err(SpeechError::Engine(
                "no audio player found (aplay/paplay/ffplay)".into(),
            )),
        }
    }

    async fn synthesize(&self, request: &PlaybackRequest, out_wav: &Path) -> Result<()> {
        let bound = Some(self.cfg.timeout());
        match self.backend {
            Backend::Piper => {
                let cmd = self.piper_command(request, out_wav)?;
                self.run(cmd, Some(&request.text), bound).await?;
                if (request.volume - 1.0).abs() > f32::EPSILON {
                    let mut buf = tokio::fs::read(out_wav).await?;
                    if scale_pcm16(&mut buf, request.volume) {
                        tokio::fs::write(out_wav, &buf).await?;
                    } else {
                        warn!(target: "tts", path = ?out_wav, "Failed to scale volume for WAV");
                    }
                }
                Ok(())
            }
            Backend::Espeak => {
                let cmd = self.espeak_command(request, Some(out_wav))?;
                self.run(cmd, None, bound).await
            }
            Backend::Console => Err(SpeechError::Unsupported("console backend".into())),
        }
    }

    fn piper_command(&self, request: &PlaybackRequest, out_wav: &Path) -> Result<Command> {
        let piper = self
            .cfg
            .piper_bin
            .as_ref()
            .ok_or_else(|| SpeechError::Engine("Piper binary not found".into()))?;
        let model = resolve_piper_model(&self.cfg, request.voice.as_ref()).ok_or_else(|| {
            SpeechError::Engine("Piper voice not found; set PIPER_VOICE or PIPER_VOICE_DIR".into())
        })?;

        let mut cmd = Command::new(piper);
        cmd.arg("-m").arg(model);
        cmd.arg("-f").arg(out_wav);
        let length_scale = (1.0f32 / request.rate.max(f32::EPSILON)).clamp(0.5, 2.0);
        cmd.arg("--length_scale")
            .arg(format!("{:.2}", length_scale));
        cmd.arg("--sample_rate")
            .arg(self.cfg.sample_rate.to_string());
        Ok(cmd)
    }

    fn espeak_command(&self, request: &PlaybackRequest, out_wav: Option<&Path>) -> Result<Command> {
        let espeak = self
            .cfg
            .espeak_bin
            .as_ref()
            .ok_or_else(|| SpeechError::Engine("espeak-ng not found".into()))?;
        let (wpm, pitch, amp) = espeak_params(request);
        let mut cmd = Command::new(espeak);
        if let Some(voice) = &request.voice {
            cmd.arg("-v").arg(&voice.id);
        }
        cmd.arg("-s").arg(wpm.to_string());
        cmd.arg("-p").arg(pitch.to_string());
        cmd.arg("-a").arg(amp.to_string());
        if let Some(path) = out_wav {
            cmd.arg("-w").arg(path);
        }
        cmd.arg("--").arg(&request.text);
        Ok(cmd)
    }

    /// Run a child to completion, registering its pid for pause/resume.
    ///
    /// `bound` limits the time the child spends running; time spent paused
    /// does not count against it.
    async fn run(
        &self,
        mut cmd: Command,
        stdin_text: Option<&str>,
        bound: Option<Duration>,
    ) -> Result<()> {
        cmd.stdin(if stdin_text.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        self.control.wait_until_resumed().await;
        debug!(target: "tts", command = ?cmd.as_std(), "Running");
        let mut child = cmd.spawn()?;
        self.control.attach(child.id().unwrap_or(0));

        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                buf
            })
        });

        if let (Some(text), Some(mut stdin)) = (stdin_text, child.stdin.take()) {
            stdin.write_all(text.as_bytes()).await?;
            // Piper starts synthesizing at EOF
            drop(stdin);
        }

        let status = self.wait(&mut child, bound).await;
        self.control.detach();
        let status = status?;

        if !status.success() {
            let stderr = match stderr {
                Some(task) => task.await.unwrap_or_default(),
                None => Vec::new(),
            };
            return Err(SpeechError::Engine(format!(
                "{} exited with {}: {}",
                cmd.as_std().get_program().to_string_lossy(),
                status,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }

    async fn wait(&self, child: &mut Child, bound: Option<Duration>) -> Result<ExitStatus> {
        let Some(limit) = bound else {
            return Ok(child.wait().await?);
        };
        let mut remaining = limit;
        let mut paused = self.control.paused.subscribe();
        loop {
            if *paused.borrow_and_update() {
                tokio::select! {
                    status = child.wait() => return Ok(status?),
                    changed = paused.changed() => {
                        if changed.is_err() {
                            return Ok(child.wait().await?);
                        }
                    }
                }
                continue;
            }

            let running_since = Instant::now();
            tokio::select! {
                status = child.wait() => return Ok(status?),
                _ = sleep(remaining) => {
                    return Err(SpeechError::Engine(format!("timed out after {limit:?}")));
                }
                changed = paused.changed() => {
                    remaining = remaining.saturating_sub(running_since.elapsed());
                    if changed.is_err() {
                        return Ok(child.wait().await?);
                    }
                }
            }
        }
    }
}

/// Words per minute, pitch (0-99) and amplitude (0-200) for espeak-ng
fn espeak_params(request: &PlaybackRequest) -> (i32, i32, i32) {
    let wpm = (175.0 * request.rate).round().clamp(80.0, 450.0) as i32;
    let pitch = (50.0 * request.pitch).round().clamp(0.0, 99.0) as i32;
    let amp = (100.0 * request.volume).round().clamp(0.0, 200.0) as i32;
    (wpm, pitch, amp)
}

fn resolve_piper_model(cfg: &CliEngineConfig, voice: Option<&VoiceDescriptor>) -> Option<PathBuf> {
    if let Some(v) = voice {
        let p = PathBuf::from(&v.id);
        if p.exists() {
            return Some(p);
        }
        if let Some(dir) = &cfg.piper_voice_dir {
            let candidate = dir.join(format!("{}.onnx", v.name));
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    if let Some(v) = &cfg.piper_voice {
        return Some(v.clone());
    }
    piper_voices(cfg.piper_voice_dir.as_deref(), None)
        .into_iter()
        .next()
        .map(|v| PathBuf::from(v.id))
}

fn select_player(pref: Option<&str>) -> Option<PathBuf> {
    pref.and_then(get_from_path)
        .or_else(|| get_from_path("aplay"))
        .or_else(|| get_from_path("paplay"))
        .or_else(|| get_from_path("ffplay"))
}

fn player_command(player_bin: &Path, wav_path: &Path) -> Command {
    let mut cmd = Command::new(player_bin);
    let name = player_bin
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    match name {
        "aplay" => {
            cmd.arg("-q");
        }
        "ffplay" => {
            cmd.arg("-autoexit").arg("-nodisp").arg("-loglevel").arg("quiet");
        }
        _ => {}
    }
    cmd.arg(wav_path);
    cmd
}

#[cfg(unix)]
fn signal_process(pid: u32, signal: &str) {
    match std::process::Command::new("kill")
        .arg(format!("-{signal}"))
        .arg(pid.to_string())
        .status()
    {
        Ok(status) if status.success() => debug!(target: "tts", pid, signal, "Signalled child"),
        Ok(status) => warn!(target: "tts", pid, signal, %status, "kill reported failure"),
        Err(e) => warn!(target: "tts", pid, signal, error = %e, "Failed to run kill"),
    }
}

#[cfg(not(unix))]
fn signal_process(pid: u32, signal: &str) {
    warn!(target: "tts", pid, signal, "Pausing playback is not supported on this platform");
}
