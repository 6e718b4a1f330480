//! Client connection: relays the player's lines to the server and prints
//! everything the server sends back

use crate::input::{classify, Input};
use log::{debug, info};
use std::io;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;

pub struct Client<S> {
    stream: S,
}

impl Client<TcpStream> {
    pub async fn connect(server_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(server_addr).await?;
        info!("Connected to {}", stream.peer_addr()?);
        Ok(Self::new(stream))
    }
}

impl<S: AsyncRead + AsyncWrite> Client<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Relays lines until the server closes the connection.
    ///
    /// Once the player says `bye` or `input` runs dry, the client stops
    /// sending, half-closes the connection and keeps printing until the
    /// server hangs up.
    pub async fn run<I, O>(self, input: I, mut output: O) -> io::Result<()>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let (reader, mut writer) = tokio::io::split(self.stream);
        let mut server_lines = BufReader::new(reader).lines();
        let mut input_lines = input.lines();
        let mut sending = true;

        loop {
            tokio::select! {
                line = server_lines.next_line() => match line? {
                    Some(line) => {
                        output.write_all(line.as_bytes()).await?;
                        output.write_all(b"\n").await?;
                        output.flush().await?;
                    }
                    None => {
                        info!("Server closed the connection");
                        return Ok(());
                    }
                },

                line = input_lines.next_line(), if sending => {
                    let finished = match line? {
                        Some(line) => match classify(&line) {
                            Input::Send { line, bye } => {
                                debug!("Sending {:?}", line);
                                writer.write_all(line.as_bytes()).await?;
                                writer.write_all(b"\n").await?;
                                writer.flush().await?;
                                bye
                            }
                            Input::Skip => false,
                        },
                        None => true,
                    };

                    if finished {
                        sending = false;
                        writer.shutdown().await?;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_relays_lines_both_ways() {
        let (client_end, server_end) = duplex(1024);
        let (server_read, mut server_write) = tokio::io::split(server_end);

        let server = tokio::spawn(async move {
            server_write.write_all(b"Welcome\n").await.unwrap();
            let mut lines = BufReader::new(server_read).lines();
            assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("look"));
            server_write.write_all(b"- -\n- -\n").await.unwrap();
            assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("bye"));
            // The client half-closes after bye
            assert_eq!(lines.next_line().await.unwrap(), None);
        });

        let input: &[u8] = b"look\n\nbye\nthis is never sent\n";
        let mut output = Vec::new();
        Client::new(client_end)
            .run(input, &mut output)
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "Welcome\n- -\n- -\n");
    }

    #[tokio::test]
    async fn test_input_eof_half_closes() {
        let (client_end, server_end) = duplex(1024);
        let (server_read, mut server_write) = tokio::io::split(server_end);

        let server = tokio::spawn(async move {
            let mut lines = BufReader::new(server_read).lines();
            assert_eq!(lines.next_line().await.unwrap(), None);
            server_write.write_all(b"bye for now\n").await.unwrap();
        });

        let input: &[u8] = b"";
        let mut output = Vec::new();
        Client::new(client_end)
            .run(input, &mut output)
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "bye for now\n");
    }
}
