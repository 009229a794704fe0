// ABOUTME: Provides TCP connection management for CMPP 3.0 protocol communication
// ABOUTME: Implements frame-based I/O with buffering, split into reader and writer halves

use crate::codec::{CodecError, Frame, PduHeader, PduRegistry};
use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

/// CMPP 3.0 Connection Management
///
/// Handles frame-based communication over the single long-lived TCP
/// connection a CMPP session runs on. The stream is split into an owned
/// reader and writer because the session engine writes from two execution
/// contexts: the session worker sends SUBMIT and ACTIVE_TEST frames while
/// the receive dispatcher answers DELIVER and ACTIVE_TEST inline. The
/// [`FrameWriter`] is therefore handed to the client behind a lock, and the
/// [`FrameReader`] is owned by the per-connection read loop.
pub struct Connection;

impl Connection {
    /// Establish a TCP connection to the gateway and split it into frame
    /// halves.
    pub async fn open<T: ToSocketAddrs>(addr: T) -> io::Result<(FrameReader, FrameWriter)> {
        let socket = TcpStream::connect(addr).await?;
        Ok(Self::from_stream(socket))
    }

    /// Wrap an already-established stream (used by the test gateway).
    pub fn from_stream(socket: TcpStream) -> (FrameReader, FrameWriter) {
        let (read_half, write_half) = socket.into_split();
        (FrameReader::new(read_half), FrameWriter::new(write_half))
    }
}

/// Reading half of a CMPP connection.
pub struct FrameReader {
    read_half: OwnedReadHalf,

    // The buffer for reading frames.
    buffer: BytesMut,

    // PDU registry for decoding
    registry: PduRegistry,
}

impl FrameReader {
    fn new(read_half: OwnedReadHalf) -> Self {
        FrameReader {
            read_half,
            // CMPP PDUs are small; 4KB comfortably holds several frames.
            buffer: BytesMut::with_capacity(4 * 1024),
            registry: PduRegistry::new(),
        }
    }

    /// Read the next complete frame from the gateway.
    ///
    /// Socket reads land in an internal buffer that may hold a partial PDU
    /// or several back-to-back PDUs; each call consumes exactly one frame
    /// and leaves the remainder buffered for the next call. Returns `None`
    /// when the gateway closes the stream on a frame boundary; a close in
    /// the middle of a PDU, or bytes that do not frame correctly, are an
    /// error and the link is unusable.
    pub async fn read_frame(&mut self) -> crate::Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // Less than one full frame buffered; pull more off the socket.
            // A zero-length read is the gateway closing the stream.
            if 0 == self.read_half.read_buf(&mut self.buffer).await? {
                // Leftover bytes at close mean a PDU was cut off mid-frame.
                return self
                    .buffer
                    .is_empty()
                    .then_some(None)
                    .ok_or_else(|| "connection reset by peer".into());
            }
        }
    }

    /// Cut one frame out of the buffer, if a complete one is present.
    ///
    /// `Ok(None)` asks the caller to read more from the socket. A malformed
    /// header or body is an error: once the declared Total_Length cannot be
    /// trusted, neither can any later offset in the stream.
    fn parse_frame(&mut self) -> crate::Result<Option<Frame>> {
        let mut buf = Cursor::new(&self.buffer[..]);

        // Length check first; the full decode only runs once the whole PDU
        // is buffered.
        match Frame::check(&mut buf) {
            Ok(()) => {
                let total_length = u32::from_be_bytes([
                    self.buffer[0],
                    self.buffer[1],
                    self.buffer[2],
                    self.buffer[3],
                ]) as usize;

                // Bound the parse to the declared frame so a body that reads
                // past Total_Length is a framing error, not a wait for more
                // data that will never line up again.
                let mut frame_buf = Cursor::new(&self.buffer[..total_length]);
                let header = PduHeader::decode(&mut frame_buf)?;
                let frame = self
                    .registry
                    .decode_pdu(header, &mut frame_buf)
                    .map_err(|e| match e {
                        CodecError::Incomplete => CodecError::InvalidPduLength {
                            length: total_length as u32,
                            min: PduHeader::SIZE as u32,
                            max: crate::codec::MAX_PDU_SIZE,
                        },
                        other => other,
                    })?;

                self.buffer.advance(total_length);

                Ok(Some(frame))
            }
            // routine buffering state while a PDU straddles socket reads
            Err(CodecError::Incomplete) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writing half of a CMPP connection.
pub struct FrameWriter {
    // The write half is decorated with a `BufWriter` for write-level
    // buffering; `flush` pushes each frame out in one syscall.
    stream: BufWriter<OwnedWriteHalf>,
}

impl FrameWriter {
    fn new(write_half: OwnedWriteHalf) -> Self {
        FrameWriter {
            stream: BufWriter::new(write_half),
        }
    }

    /// Encode and send one frame, flushing it onto the wire.
    pub async fn write_frame(&mut self, frame: &Frame) -> crate::Result<()> {
        let bytes = frame.to_bytes()?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
