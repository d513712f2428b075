use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use domain::DomainError;
use domain::wizard::WizardPrompter;

/// Line-oriented prompts. An empty line or end of input dismisses the prompt.
pub struct LinePrompter<R, W> {
    io: Mutex<(R, W)>,
}

pub type StdinPrompter = LinePrompter<BufReader<Stdin>, Stdout>;

impl StdinPrompter {
    pub fn stdio() -> Self {
        LinePrompter::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LinePrompter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        self.io.into_inner()
    }

    async fn ask(io: &mut (R, W), prompt: &str) -> Result<Option<String>, DomainError> {
        let (reader, writer) = io;
        writer
            .write_all(format!("{}: ", prompt).as_bytes())
            .await
            .map_err(io_error)?;
        writer.flush().await.map_err(io_error)?;

        let mut line = String::new();
        let read = reader.read_line(&mut line).await.map_err(io_error)?;
        let answer = line.trim();
        if read == 0 || answer.is_empty() {
            return Ok(None);
        }
        Ok(Some(answer.to_string()))
    }
}

fn io_error(e: std::io::Error) -> DomainError {
    DomainError::Transport(format!("Prompt I/O failed: {}", e))
}

#[async_trait]
impl<R, W> WizardPrompter for LinePrompter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn input_text(&self, prompt: &str) -> Result<Option<String>, DomainError> {
        let mut io = self.io.lock().await;
        Self::ask(&mut io, prompt).await
    }

    async fn pick(&self, prompt: &str, items: &[String]) -> Result<Option<usize>, DomainError> {
        let mut io = self.io.lock().await;
        let mut menu = String::new();
        for (i, item) in items.iter().enumerate() {
            menu.push_str(&format!("  {}) {}\n", i + 1, item));
        }
        io.1.write_all(menu.as_bytes()).await.map_err(io_error)?;

        loop {
            let Some(answer) = Self::ask(&mut io, prompt).await? else {
                return Ok(None);
            };
            match answer.parse::<usize>() {
                Ok(n) if (1..=items.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => {
                    io.1
                        .write_all(format!("Enter a number between 1 and {}\n", items.len()).as_bytes())
                        .await
                        .map_err(io_error)?;
                }
            }
        }
    }
}
