//! Compilers delegating to external command line tools.
//!
//! - [`CoffeeScriptCompiler`] handles single files as the watcher reports them.
//! - [`BatchCompiler`] compiles whole source roots once at startup.
//! - [`ToolRunner`] is the seam where the child process is started.

mod batch;
mod coffee;
mod tool;

pub use batch::{BatchCompiler, BatchReport};
pub use coffee::CoffeeScriptCompiler;
pub use tool::{ExternalToolResult, ProcessRunner, ToolCommand, ToolInvocation, ToolRunner};

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{ExternalToolResult, ToolInvocation, ToolRunner};

    /// Records invocations and answers with a canned result.
    pub(crate) struct RecordingRunner {
        result: Option<ExternalToolResult>,
        invocations: Mutex<Vec<ToolInvocation>>,
    }

    impl RecordingRunner {
        pub(crate) fn succeeding() -> Self {
            Self::answering(Some(ExternalToolResult::default()))
        }

        pub(crate) fn failing(exit_code: i32, stderr: &str) -> Self {
            Self::answering(Some(ExternalToolResult {
                exit_code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            }))
        }

        /// Behaves as if the program does not exist.
        pub(crate) fn unavailable() -> Self {
            Self::answering(None)
        }

        fn answering(result: Option<ExternalToolResult>) -> Self {
            Self {
                result,
                invocations: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn invocations(&self) -> Vec<ToolInvocation> {
            self.invocations.lock().clone()
        }
    }

    #[async_trait]
    impl ToolRunner for RecordingRunner {
        async fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ExternalToolResult> {
            self.invocations.lock().push(invocation.clone());
            self.result.clone().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory")
            })
        }
    }
}
