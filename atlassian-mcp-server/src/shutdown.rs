//! Mapping from how the server stopped to a process exit status

use atlassian_mcp_shared::AtlassianError;

#[derive(Debug)]
pub enum Shutdown {
    Completed,
    /// SIGINT / Ctrl-C
    Interrupted,
    /// The client closed the transport under us
    BrokenPipe,
    Failed(AtlassianError),
}

impl Shutdown {
    pub fn from_result(result: atlassian_mcp_shared::Result<()>) -> Self {
        match result {
            Ok(()) => Shutdown::Completed,
            Err(err) if is_broken_pipe(&err) => Shutdown::BrokenPipe,
            Err(err) => Shutdown::Failed(err),
        }
    }

    pub fn exit_status(&self) -> u8 {
        match self {
            Shutdown::Completed => 0,
            Shutdown::Interrupted => 130,
            Shutdown::BrokenPipe => 141,
            Shutdown::Failed(_) => 1,
        }
    }
}

fn is_broken_pipe(err: &AtlassianError) -> bool {
    match err {
        AtlassianError::Io(io) => io.kind() == std::io::ErrorKind::BrokenPipe,
        // The transport reports its io errors as text
        AtlassianError::Mcp(message) => message.to_lowercase().contains("broken pipe"),
        _ => false,
    }
}
