// src/session.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::audio::trim::seconds_to_millis;
use crate::audio::{
    decode_audio, render_svg, trim, AudioAsset, AudioInfo, SelectionRange, TrimmedClip,
    WaveformStyle,
};
use crate::error::AudioError;
use crate::selection::RangeSelector;

/// Errors raised by session-level actions
#[derive(Debug, Error)]
pub enum SessionError {
    /// The action needs an uploaded file and there is none
    #[error("No audio file has been uploaded yet")]
    NoAudioLoaded,

    /// Unknown or already closed session id
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// A decoded upload and its waveform, ready to be swapped into a session
#[derive(Debug)]
pub struct PreparedUpload {
    pub file_name: String,
    pub asset: AudioAsset,
    pub waveform_svg: String,
}

/// Decode an upload and render its waveform without touching any session
///
/// Doing the slow work up front means a rejected upload leaves the
/// session exactly as it was.
pub fn prepare_upload(
    file_name: &str,
    raw_bytes: Arc<[u8]>,
    style: &WaveformStyle,
) -> Result<PreparedUpload, AudioError> {
    let asset = decode_audio(raw_bytes, file_name)?;
    let waveform_svg = render_svg(&asset, style);

    Ok(PreparedUpload {
        file_name: file_name.to_string(),
        asset,
        waveform_svg,
    })
}

/// The file currently loaded in a session
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    pub file_name: String,
    pub asset: Arc<AudioAsset>,
    pub waveform_svg: Arc<str>,
    /// Bumped on every upload so stale clips can be told apart
    pub generation: u64,
}

/// Identifies a clip by the upload it came from and its millisecond bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipKey {
    pub generation: u64,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Everything needed to produce the clip for the current selection
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub file_name: String,
    pub key: ClipKey,
    pub asset: Arc<AudioAsset>,
    pub range: SelectionRange,
    /// Set when the same clip was already encoded
    pub cached: Option<Arc<TrimmedClip>>,
}

impl ClipRequest {
    /// Return the cached clip or encode it now
    pub fn resolve(&self) -> Result<Arc<TrimmedClip>, AudioError> {
        match &self.cached {
            Some(clip) => Ok(Arc::clone(clip)),
            None => trim(&self.asset, &self.range).map(Arc::new),
        }
    }
}

/// Per-user state: the loaded file, the selection, and the last clip
#[derive(Debug, Default)]
pub struct Session {
    loaded: Option<LoadedAudio>,
    selector: RangeSelector,
    last_clip: Option<(ClipKey, Arc<TrimmedClip>)>,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was loaded with a new upload
    ///
    /// The selection resets to the whole file and cached clips are dropped.
    pub fn load(&mut self, upload: PreparedUpload) -> AudioInfo {
        let info = AudioInfo::describe(&upload.file_name, &upload.asset);

        self.generation += 1;
        self.selector.activate(upload.asset.duration_seconds());
        self.last_clip = None;
        self.loaded = Some(LoadedAudio {
            file_name: upload.file_name,
            asset: Arc::new(upload.asset),
            waveform_svg: Arc::from(upload.waveform_svg),
            generation: self.generation,
        });

        info
    }

    /// Discard the loaded file and return to the empty state
    pub fn clear(&mut self) {
        self.loaded = None;
        self.selector.reset();
        self.last_clip = None;
    }

    pub fn loaded(&self) -> Option<&LoadedAudio> {
        self.loaded.as_ref()
    }

    pub fn info(&self) -> Option<AudioInfo> {
        self.loaded
            .as_ref()
            .map(|loaded| AudioInfo::describe(&loaded.file_name, &loaded.asset))
    }

    pub fn selection(&self) -> Option<SelectionRange> {
        self.selector.range()
    }

    pub fn select(&mut self, start_seconds: f64, end_seconds: f64) -> Result<SelectionRange, SessionError> {
        self.selector.adjust(start_seconds, end_seconds)
    }

    /// Snapshot what is needed to trim the current selection
    pub fn clip_request(&self) -> Result<ClipRequest, SessionError> {
        let loaded = self.loaded.as_ref().ok_or(SessionError::NoAudioLoaded)?;
        let range = self.selector.range().ok_or(SessionError::NoAudioLoaded)?;

        let key = ClipKey {
            generation: loaded.generation,
            start_ms: seconds_to_millis(range.start_seconds),
            end_ms: seconds_to_millis(range.end_seconds),
        };
        let cached = self
            .last_clip
            .as_ref()
            .filter(|(cached_key, _)| *cached_key == key)
            .map(|(_, clip)| Arc::clone(clip));

        Ok(ClipRequest {
            file_name: loaded.file_name.clone(),
            key,
            asset: Arc::clone(&loaded.asset),
            range,
            cached,
        })
    }

    /// Remember a finished clip, unless the upload it came from was replaced
    pub fn remember_clip(&mut self, key: ClipKey, clip: Arc<TrimmedClip>) {
        let current = self.loaded.as_ref().map(|loaded| loaded.generation);
        if current == Some(key.generation) {
            self.last_clip = Some((key, clip));
        }
    }

    /// Trim the current selection, reusing the last clip when it matches
    pub fn current_clip(&mut self) -> Result<Arc<TrimmedClip>, SessionError> {
        let request = self.clip_request()?;
        let clip = request.resolve()?;
        self.remember_clip(request.key, Arc::clone(&clip));
        Ok(clip)
    }
}

/// How long a session may sit untouched before its audio is dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct Entry {
    session: Session,
    last_seen: Instant,
}

/// All live sessions, keyed by id
///
/// A session that goes unused for longer than the idle timeout is evicted,
/// either by [`SessionStore::evict_idle`] or the next time it is looked up.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Entry>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        // A panic mid-action leaves the map itself consistent
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_idle(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) > self.idle_timeout
    }

    /// Open a new, empty session
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.lock();
        self.evict_locked(&mut sessions, now);
        sessions.insert(
            id,
            Entry {
                session: Session::new(),
                last_seen: now,
            },
        );
        info!(session = %id, open_sessions = sessions.len(), "session opened");
        id
    }

    /// Close a session, dropping its audio; false if it did not exist
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            info!(session = %id, "session closed");
        }
        removed
    }

    /// Drop every session idle for longer than the timeout
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.lock();
        self.evict_locked(&mut sessions, now)
    }

    fn evict_locked(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle = self.is_idle(entry, now);
            if idle {
                info!(session = %id, "idle session evicted");
            }
            !idle
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run `action` against one session while holding the store lock
    ///
    /// Counts as activity for the idle timeout. Keep `action` short;
    /// decoding and encoding belong outside.
    pub fn with_session<T>(
        &self,
        id: Uuid,
        action: impl FnOnce(&mut Session) -> T,
    ) -> Result<T, SessionError> {
        let now = Instant::now();
        let mut sessions = self.lock();

        let expired = match sessions.get(&id) {
            Some(entry) => self.is_idle(entry, now),
            None => return Err(SessionError::NotFound(id)),
        };
        if expired {
            sessions.remove(&id);
            info!(session = %id, "idle session evicted");
            return Err(SessionError::NotFound(id));
        }

        let entry = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        entry.last_seen = now;
        Ok(action(&mut entry.session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sine_wav;

    fn upload(name: &str, seconds: f64) -> PreparedUpload {
        prepare_upload(name, sine_wav(seconds, 8000, 1).into(), &WaveformStyle::default()).unwrap()
    }

    #[test]
    fn test_new_session_is_unset() {
        let session = Session::new();
        assert!(session.loaded().is_none());
        assert!(session.selection().is_none());
        assert!(matches!(session.clip_request(), Err(SessionError::NoAudioLoaded)));
    }

    #[test]
    fn test_load_activates_full_selection() {
        let mut session = Session::new();
        let info = session.load(upload("take.wav", 4.0));

        assert_eq!(info.file_name, "take.wav");
        assert!((info.duration_seconds - 4.0).abs() < 1e-9);
        assert_eq!(session.selection(), Some(SelectionRange::full(4.0)));
        assert!(session.loaded().unwrap().waveform_svg.starts_with("<svg"));
    }

    #[test]
    fn test_failed_upload_leaves_session_untouched() {
        let mut session = Session::new();
        session.load(upload("take.wav", 4.0));
        session.select(1.0, 2.0).unwrap();

        let result = prepare_upload(
            "x.mp3",
            b"garbage bytes".to_vec().into(),
            &WaveformStyle::default(),
        );
        assert!(matches!(result, Err(AudioError::UnsupportedFormat(_))));

        assert_eq!(session.info().unwrap().file_name, "take.wav");
        assert_eq!(session.selection(), Some(SelectionRange::new(1.0, 2.0).unwrap()));
    }

    #[test]
    fn test_clip_is_cached_for_same_range() {
        let mut session = Session::new();
        session.load(upload("take.wav", 3.0));
        session.select(0.5, 1.5).unwrap();

        let first = session.current_clip().unwrap();
        let request = session.clip_request().unwrap();
        assert!(request.cached.is_some());

        let second = session.current_clip().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_new_range_misses_cache() {
        let mut session = Session::new();
        session.load(upload("take.wav", 3.0));
        session.current_clip().unwrap();

        session.select(0.5, 1.0).unwrap();
        assert!(session.clip_request().unwrap().cached.is_none());
    }

    #[test]
    fn test_replacement_invalidates_cache_and_selection() {
        let mut session = Session::new();
        session.load(upload("first.wav", 3.0));
        session.select(1.0, 2.0).unwrap();
        let stale = session.clip_request().unwrap();
        session.current_clip().unwrap();

        session.load(upload("second.wav", 5.0));
        assert_eq!(session.selection(), Some(SelectionRange::full(5.0)));
        assert!(session.clip_request().unwrap().cached.is_none());

        // A clip that finishes after the replacement is ignored
        let clip = stale.resolve().unwrap();
        session.remember_clip(stale.key, clip);
        assert!(session.clip_request().unwrap().cached.is_none());
    }

    #[test]
    fn test_clear_returns_to_unset() {
        let mut session = Session::new();
        session.load(upload("take.wav", 1.0));
        session.clear();

        assert!(session.info().is_none());
        assert!(matches!(session.select(0.0, 1.0), Err(SessionError::NoAudioLoaded)));
    }

    #[test]
    fn test_store_isolates_sessions() {
        let store = SessionStore::new();
        let a = store.create();
        let b = store.create();
        assert_eq!(store.len(), 2);

        store
            .with_session(a, |session| session.load(upload("a.wav", 2.0)))
            .unwrap();

        let b_info = store.with_session(b, |session| session.info()).unwrap();
        assert!(b_info.is_none());

        assert!(store.remove(a));
        assert!(!store.remove(a));
        assert!(matches!(
            store.with_session(a, |_| ()),
            Err(SessionError::NotFound(id)) if id == a
        ));
    }

    #[test]
    fn test_idle_session_is_evicted() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(60));
        let id = store.create();
        store
            .with_session(id, |session| session.load(upload("take.wav", 1.0)))
            .unwrap();

        assert_eq!(store.evict_idle_at(Instant::now()), 0);
        assert_eq!(store.len(), 1);

        assert_eq!(store.evict_idle_at(Instant::now() + Duration::from_secs(61)), 1);
        assert!(store.is_empty());
        assert!(matches!(
            store.with_session(id, |_| ()),
            Err(SessionError::NotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn test_activity_keeps_session_alive() {
        let timeout = Duration::from_secs(60);
        let store = SessionStore::with_idle_timeout(timeout);
        let active = store.create();
        let idle = store.create();

        std::thread::sleep(Duration::from_millis(20));
        let touched_at = Instant::now();
        store.with_session(active, |_| ()).unwrap();

        assert_eq!(store.evict_idle_at(touched_at + timeout), 1);
        assert!(store.with_session(active, |_| ()).is_ok());
        assert!(store.with_session(idle, |_| ()).is_err());
    }

    #[test]
    fn test_expired_session_is_dropped_on_lookup() {
        let store = SessionStore::with_idle_timeout(Duration::ZERO);
        let id = store.create();
        std::thread::sleep(Duration::from_millis(5));

        assert!(matches!(store.with_session(id, |_| ()), Err(SessionError::NotFound(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_sweeps_idle_sessions() {
        let store = SessionStore::with_idle_timeout(Duration::ZERO);
        store.create();
        store.create();
        std::thread::sleep(Duration::from_millis(5));

        store.create();
        assert_eq!(store.len(), 1);
    }
}
