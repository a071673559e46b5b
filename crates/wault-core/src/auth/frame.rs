use std::sync::Mutex;

use anyhow::Result;
use url::Url;

use crate::config::ClientConfig;

/// Element id given to the sign-in frame
pub const FRAME_ID: &str = "wault_frame";

/// The embedded sign-in frame the host is asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFrame {
    pub id: String,
    pub src: Url,
    pub background_image: Url,
}

impl LoginFrame {
    pub fn for_config(config: &ClientConfig) -> Result<Self, url::ParseError> {
        let mut src = Url::parse(&format!(
            "{}/Account/SignInFrame",
            config.authority_base_url
        ))?;
        src.query_pairs_mut()
            .append_pair("clientId", &config.client_id)
            .append_pair("waultId", &config.wault_id)
            .append_pair("email", &config.user_email_hint);

        let background_image = Url::parse(&format!(
            "{}/images/wym_logo.svg",
            config.authority_base_url
        ))?;

        Ok(Self {
            id: FRAME_ID.to_string(),
            src,
            background_image,
        })
    }
}

/// Where sign-in frames get mounted: a DOM, a webview, a terminal prompt.
pub trait FrameHost: Send + Sync {
    fn attach(&self, frame: &LoginFrame) -> Result<()>;

    fn detach(&self, frame_id: &str);
}

/// Headless host that only remembers what it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingFrameHost {
    state: Mutex<RecordingState>,
}

#[derive(Debug, Default)]
struct RecordingState {
    attached: Vec<LoginFrame>,
    open: Option<LoginFrame>,
    detached: usize,
}

impl RecordingFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total frames ever attached.
    pub fn attach_count(&self) -> usize {
        self.lock().attached.len()
    }

    pub fn detach_count(&self) -> usize {
        self.lock().detached
    }

    /// The frame currently in the document, if any.
    pub fn open_frame(&self) -> Option<LoginFrame> {
        self.lock().open.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FrameHost for RecordingFrameHost {
    fn attach(&self, frame: &LoginFrame) -> Result<()> {
        let mut state = self.lock();
        state.attached.push(frame.clone());
        state.open = Some(frame.clone());
        Ok(())
    }

    fn detach(&self, frame_id: &str) {
        let mut state = self.lock();
        if state.open.as_ref().is_some_and(|f| f.id == frame_id) {
            state.open = None;
            state.detached += 1;
        }
    }
}
