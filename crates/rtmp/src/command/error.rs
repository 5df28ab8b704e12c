use rtmpproxy_amf0::Amf0Error;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("amf0 error: {0}")]
    Amf0(#[from] Amf0Error),
    #[error("{command} argument {index} is missing")]
    MissingArgument {
        command: &'static str,
        index: usize,
    },
    #[error("{command} argument {index} is not an object")]
    ExpectedObject {
        command: &'static str,
        index: usize,
    },
}
