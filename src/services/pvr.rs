//! Downstream PVR client restart
//!
//! The PVR client only rereads the generated playlist and guide when it is
//! restarted. A restart interrupts playback, so unforced restarts are
//! postponed while something is playing and retried later by the
//! background service.

use std::time::Duration;

use tracing::{debug, info};

use crate::errors::AppResult;
use crate::host::Host;

const RESTART_PAUSE: Duration = Duration::from_secs(1);

/// Restart bookkeeping owned by whoever drives refreshes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartState {
    /// A restart was postponed because playback was active
    pub pending: bool,
}

/// What [`PvrRestarter::restart`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    Restarted,
    Postponed,
}

pub struct PvrRestarter {
    host: Host,
    pvr_addon_id: String,
    pause: Duration,
}

impl PvrRestarter {
    pub fn new(host: Host, pvr_addon_id: impl Into<String>) -> Self {
        Self {
            host,
            pvr_addon_id: pvr_addon_id.into(),
            pause: RESTART_PAUSE,
        }
    }

    /// Override the pause between disabling and re-enabling the client
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn pvr_addon_id(&self) -> &str {
        &self.pvr_addon_id
    }

    /// Restart the PVR client by disabling and re-enabling it
    ///
    /// Unless `force` is set, the restart is postponed while TV or radio is
    /// playing and `state.pending` is raised instead.
    pub async fn restart(&self, force: bool, state: &mut RestartState) -> AppResult<RestartOutcome> {
        if !force && self.host.playback.is_playing() {
            info!("Postponing restart of {} until playback has stopped", self.pvr_addon_id);
            state.pending = true;
            return Ok(RestartOutcome::Postponed);
        }

        state.pending = false;

        debug!("Disabling {}", self.pvr_addon_id);
        self.host
            .addons
            .set_addon_enabled(&self.pvr_addon_id, false)
            .await?;
        tokio::time::sleep(self.pause).await;
        debug!("Enabling {}", self.pvr_addon_id);
        self.host
            .addons
            .set_addon_enabled(&self.pvr_addon_id, true)
            .await?;

        info!("Restarted {}", self.pvr_addon_id);
        Ok(RestartOutcome::Restarted)
    }

    /// Run a postponed restart once playback has stopped
    pub async fn retry_pending(&self, state: &mut RestartState) -> AppResult<Option<RestartOutcome>> {
        if !state.pending || self.host.playback.is_playing() {
            return Ok(None);
        }
        self.restart(false, state).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{
        ActionExecutor, AddonInfo, AddonRegistry, Dialogs, HostAction, PlaybackMonitor,
        SettingsStore,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        toggles: Mutex<Vec<(String, bool)>>,
        playing: AtomicBool,
    }

    #[async_trait]
    impl ActionExecutor for Recorder {
        async fn execute(&self, _action: HostAction) -> AppResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl AddonRegistry for Recorder {
        async fn plugin_addons(&self) -> AppResult<Vec<AddonInfo>> {
            Ok(Vec::new())
        }

        async fn addon_setting(&self, _addon_id: &str, _key: &str) -> AppResult<Option<String>> {
            Ok(None)
        }

        async fn set_addon_setting(&self, _addon_id: &str, _key: &str, _value: &str) -> AppResult<()> {
            Ok(())
        }

        async fn set_addon_enabled(&self, addon_id: &str, enabled: bool) -> AppResult<()> {
            self.toggles
                .lock()
                .unwrap()
                .push((addon_id.to_string(), enabled));
            Ok(())
        }
    }

    impl SettingsStore for Recorder {
        fn get_string(&self, _key: &str) -> Option<String> {
            None
        }
        fn set_string(&self, _key: &str, _value: &str) -> AppResult<()> {
            Ok(())
        }
        fn get_int(&self, _key: &str) -> Option<i64> {
            None
        }
        fn set_int(&self, _key: &str, _value: i64) -> AppResult<()> {
            Ok(())
        }
        fn get_bool(&self, _key: &str) -> Option<bool> {
            None
        }
        fn set_bool(&self, _key: &str, _value: bool) -> AppResult<()> {
            Ok(())
        }
    }

    impl PlaybackMonitor for Recorder {
        fn is_playing_tv(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
        fn is_playing_radio(&self) -> bool {
            false
        }
    }

    #[async_trait]
    impl Dialogs for Recorder {
        fn ok(&self, _heading: &str, _message: &str) {}
        fn notify(&self, _message: &str) {}
        async fn select(&self, _heading: &str, _options: &[String]) -> Option<usize> {
            None
        }
        async fn yes_no(&self, _heading: &str, _message: &str) -> bool {
            false
        }
    }

    fn restarter(recorder: &Arc<Recorder>) -> PvrRestarter {
        let host = Host {
            actions: recorder.clone(),
            addons: recorder.clone(),
            settings: recorder.clone(),
            playback: recorder.clone(),
            dialogs: recorder.clone(),
        };
        PvrRestarter::new(host, "pvr.iptvsimple").with_pause(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_restart_toggles_addon() {
        let recorder = Arc::new(Recorder::default());
        let mut state = RestartState::default();

        let outcome = restarter(&recorder).restart(false, &mut state).await.unwrap();

        assert_eq!(outcome, RestartOutcome::Restarted);
        assert!(!state.pending);
        assert_eq!(
            *recorder.toggles.lock().unwrap(),
            vec![
                ("pvr.iptvsimple".to_string(), false),
                ("pvr.iptvsimple".to_string(), true)
            ]
        );
    }

    #[tokio::test]
    async fn test_restart_postponed_during_playback_then_retried() {
        let recorder = Arc::new(Recorder::default());
        recorder.playing.store(true, Ordering::SeqCst);
        let restarter = restarter(&recorder);
        let mut state = RestartState::default();

        let outcome = restarter.restart(false, &mut state).await.unwrap();
        assert_eq!(outcome, RestartOutcome::Postponed);
        assert!(state.pending);
        assert!(recorder.toggles.lock().unwrap().is_empty());

        assert_eq!(restarter.retry_pending(&mut state).await.unwrap(), None);

        recorder.playing.store(false, Ordering::SeqCst);
        assert_eq!(
            restarter.retry_pending(&mut state).await.unwrap(),
            Some(RestartOutcome::Restarted)
        );
        assert!(!state.pending);
        assert_eq!(recorder.toggles.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_forced_restart_ignores_playback() {
        let recorder = Arc::new(Recorder::default());
        recorder.playing.store(true, Ordering::SeqCst);
        let mut state = RestartState { pending: true };

        let outcome = restarter(&recorder).restart(true, &mut state).await.unwrap();
        assert_eq!(outcome, RestartOutcome::Restarted);
        assert!(!state.pending);
    }
}
