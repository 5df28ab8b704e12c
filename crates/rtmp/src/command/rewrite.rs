//! Rewrites publish session commands in flight.

use super::{Command, CommandError};

/// What a rewrite decided about the session's control phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Forward the command and keep parsing.
    Forwarded,
    /// The publish command was forwarded, the control phase is over.
    Publish,
}

/// The substitutions applied to a publish session.
///
/// The application name, stream key and play url the client sent are
/// replaced with the ones of the configured remote target. Everything else
/// about a command, including arguments of commands the relay does not
/// recognize, is forwarded untouched.
#[derive(Debug, Clone)]
pub struct RewriteRules {
    /// Replaces the `app` key of the connect command object.
    pub app_name: String,
    /// Replaces the stream key argument of the stream commands.
    pub stream_name: String,
    /// Replaces the `swfUrl` and `tcUrl` keys of the connect command object.
    pub play_url: String,
    /// Overrides the `flashVer` key of the connect command object when set.
    pub flash_ver: Option<String>,
    /// Sets the `rtmpType` key of the connect command object when set.
    pub rtmp_type: Option<String>,
    /// Keep parsing and rewriting after the publish command was forwarded.
    pub force_handle: bool,
}

impl RewriteRules {
    /// Rewrites a command in place.
    pub fn apply(&self, command: &mut Command) -> Result<RewriteOutcome, CommandError> {
        match command.name.as_str() {
            "connect" => {
                self.rewrite_connect(command)?;
                Ok(RewriteOutcome::Forwarded)
            }
            "releaseStream" => {
                self.set_stream_name(command, "releaseStream")?;
                Ok(RewriteOutcome::Forwarded)
            }
            "FCPublish" => {
                self.set_stream_name(command, "FCPublish")?;
                Ok(RewriteOutcome::Forwarded)
            }
            "FCUnpublish" => {
                self.set_stream_name(command, "FCUnpublish")?;
                Ok(RewriteOutcome::Forwarded)
            }
            "publish" => {
                self.set_stream_name(command, "publish")?;
                Ok(RewriteOutcome::Publish)
            }
            _ => Ok(RewriteOutcome::Forwarded),
        }
    }

    fn rewrite_connect(&self, command: &mut Command) -> Result<(), CommandError> {
        let arg = command.args.first_mut().ok_or(CommandError::MissingArgument {
            command: "connect",
            index: 0,
        })?;
        let object = arg.as_object_mut().ok_or(CommandError::ExpectedObject {
            command: "connect",
            index: 0,
        })?;

        object.set("app", self.app_name.as_str());
        object.set("swfUrl", self.play_url.as_str());
        object.set("tcUrl", self.play_url.as_str());

        if let Some(flash_ver) = &self.flash_ver {
            object.set("flashVer", flash_ver.as_str());
        }
        if let Some(rtmp_type) = &self.rtmp_type {
            // the key is literally "rtmpType", not the conventional "type"
            object.set("rtmpType", rtmp_type.as_str());
        }

        tracing::info!(
            app = %self.app_name,
            tc_url = %self.play_url,
            "rewrote connect command"
        );

        Ok(())
    }

    fn set_stream_name(&self, command: &mut Command, name: &'static str) -> Result<(), CommandError> {
        let arg = command
            .args
            .get_mut(1)
            .ok_or(CommandError::MissingArgument { command: name, index: 1 })?;
        *arg = self.stream_name.as_str().into();

        Ok(())
    }
}
