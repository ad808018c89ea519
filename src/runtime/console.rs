//! Text console runtime for offline calls.
//!
//! There is no speech pipeline or reply model behind it: activations,
//! fixed utterances and reply requests are printed so a developer can walk
//! through the handoff graph from a terminal.

use std::io::{self, Write};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{PersonaProfile, SessionRuntime};
use crate::error::Result;

pub struct ConsoleRuntime {
    call_id: String,
    speaker: Mutex<String>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleRuntime {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self::with_writer(call_id, Box::new(io::stdout()))
    }

    pub fn with_writer(call_id: impl Into<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            call_id: call_id.into(),
            speaker: Mutex::new("agent".to_string()),
            out: Mutex::new(out),
        }
    }

    fn line(&self, text: &str) -> Result<()> {
        let mut out = self.out.lock();
        writeln!(out, "{}", text)?;
        out.flush()?;
        Ok(())
    }
}

#[async_trait]
impl SessionRuntime for ConsoleRuntime {
    fn call_id(&self) -> &str {
        &self.call_id
    }

    async fn activate(&self, profile: &PersonaProfile) -> Result<()> {
        *self.speaker.lock() = profile.name.clone();
        self.line(&format!(
            "[{} ({}) is now on the call, voice {}]",
            profile.name, profile.persona_id, profile.voice
        ))
    }

    async fn generate_reply(&self, instructions: Option<&str>, allow_interruptions: bool) -> Result<()> {
        let speaker = self.speaker.lock().clone();
        let lock = if allow_interruptions { "" } else { ", uninterruptible" };
        match instructions {
            Some(text) => self.line(&format!("{}: <reply: {}{}>", speaker, text, lock)),
            None => self.line(&format!("{}: <reply{}>", speaker, lock)),
        }
    }

    async fn say(&self, text: &str, _allow_interruptions: bool) -> Result<()> {
        let speaker = self.speaker.lock().clone();
        self.line(&format!("{}: {}", speaker, text))
    }

    async fn inject_context(&self, text: &str) -> Result<()> {
        self.line(&format!("[context]\n{}", text))
    }

    async fn interrupt(&self) -> Result<()> {
        self.line("[speech interrupted]")
    }

    async fn delete_call_resource(&self, call_id: &str) -> Result<()> {
        self.line(&format!("[call {} closed]", call_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::VoiceIdentity;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_console_transcript() {
        let buf = SharedBuf::default();
        let runtime = ConsoleRuntime::with_writer("mock_room", Box::new(buf.clone()));

        let profile = PersonaProfile {
            instance_id: uuid::Uuid::new_v4(),
            persona_id: "support".into(),
            name: "Sarah".into(),
            instructions: String::new(),
            voice: VoiceIdentity::cartesia("v1"),
            tools: vec![],
        };
        runtime.activate(&profile).await.unwrap();
        runtime.say("Hello there.", true).await.unwrap();
        runtime.generate_reply(Some("say goodbye"), false).await.unwrap();

        let text = String::from_utf8(buf.0.lock().clone()).unwrap();
        assert!(text.contains("[Sarah (support) is now on the call"));
        assert!(text.contains("Sarah: Hello there."));
        assert!(text.contains("Sarah: <reply: say goodbye, uninterruptible>"));
    }
}
