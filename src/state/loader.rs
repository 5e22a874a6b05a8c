//! Background thread for async image loading and decoding.
//!
//! Reading and decoding an image can take long enough to stall the UI, so
//! the session hands `(name, token)` requests to a dedicated thread and
//! applies the finished results from its tick. Results carry the load
//! token of the request that produced them; the session decides whether a
//! result is still current.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::files::ImageFolder;

/// Request to load and decode one image.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Image file name inside the bound folder.
    pub name: String,
    /// Load token current when the request was issued.
    pub token: u64,
}

/// A successfully decoded image.
pub struct LoadedImage {
    pub name: String,
    pub token: u64,
    pub width: u32,
    pub height: u32,
    /// Decoded RGBA8 pixels, row-major, for the host to display.
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedImage")
            .field("name", &self.name)
            .field("token", &self.token)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &format_args!("{} bytes", self.pixels.len()))
            .finish()
    }
}

/// A load that did not produce an image.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub name: String,
    pub token: u64,
    pub message: String,
}

/// Outcome of one load request.
pub type LoadResult = Result<LoadedImage, LoadFailure>;

/// Message sent to the loader thread.
enum ThreadMessage {
    Load(LoadRequest),
    Shutdown,
}

/// Manages the background thread that loads and decodes images.
///
/// Requests are processed one at a time in submission order, so results
/// arrive in the order the session asked for them; staleness only comes
/// from the session's token moving on.
pub struct ImageLoadWorker {
    request_tx: Sender<ThreadMessage>,
    result_rx: Receiver<LoadResult>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ImageLoadWorker {
    /// Spawn the loader thread over an image-folder binding.
    ///
    /// Returns `Err` if the thread fails to spawn.
    pub fn spawn(folder: Arc<dyn ImageFolder>) -> Result<Self, String> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (result_tx, result_rx) = mpsc::channel::<LoadResult>();

        let thread_handle = thread::Builder::new()
            .name("image-loader".to_string())
            .spawn(move || {
                log::debug!("Image loader thread started");
                thread_loop(&*folder, &request_rx, &result_tx);
                log::debug!("Image loader thread exiting");
            })
            .map_err(|e| format!("Failed to spawn image loader thread: {e}"))?;

        Ok(Self {
            request_tx,
            result_rx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Queue a load. The result surfaces later via [`Self::take_one_result`].
    pub fn request(&self, request: LoadRequest) {
        log::debug!(
            "Requesting load of {:?} (token {})",
            request.name,
            request.token
        );
        if self.request_tx.send(ThreadMessage::Load(request)).is_err() {
            log::error!("Failed to send load request: channel closed");
        }
    }

    /// Take one completed result, oldest first. Non-blocking.
    pub fn take_one_result(&self) -> Option<LoadResult> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Image loader thread disconnected");
                None
            }
        }
    }
}

impl Drop for ImageLoadWorker {
    fn drop(&mut self) {
        let _ = self.request_tx.send(ThreadMessage::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Image loader thread panicked: {e:?}");
            }
        }
    }
}

/// Loader thread main loop.
fn thread_loop(
    folder: &dyn ImageFolder,
    request_rx: &Receiver<ThreadMessage>,
    result_tx: &Sender<LoadResult>,
) {
    loop {
        match request_rx.recv() {
            Ok(ThreadMessage::Load(request)) => {
                let result = load_one(folder, request);
                if result_tx.send(result).is_err() {
                    log::warn!("Result channel closed, loader thread exiting");
                    break;
                }
            }
            Ok(ThreadMessage::Shutdown) => {
                log::debug!("Received shutdown signal");
                break;
            }
            Err(_) => {
                // Channel closed, exit.
                break;
            }
        }
    }
}

/// Read and decode one image.
fn load_one(folder: &dyn ImageFolder, request: LoadRequest) -> LoadResult {
    let LoadRequest { name, token } = request;

    let failure = |message: String| LoadFailure {
        name: name.clone(),
        token,
        message,
    };

    let bytes = folder
        .read_image(&name)
        .map_err(|e| failure(e.to_string()))?;
    log::debug!("Decoding {name:?} ({} bytes)", bytes.len());

    let decoded = image::load_from_memory(&bytes).map_err(|e| failure(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!("Decoded {name:?}: {width}x{height}");

    Ok(LoadedImage {
        name,
        token,
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{MemImageFolder, png_bytes};
    use std::time::{Duration, Instant};

    fn wait_for_result(worker: &ImageLoadWorker) -> LoadResult {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = worker.take_one_result() {
                return result;
            }
            assert!(Instant::now() < deadline, "loader produced no result");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_decodes_images_with_dimensions() {
        let folder = MemImageFolder::new([("img1.png", png_bytes(8, 6))]);
        let worker = ImageLoadWorker::spawn(Arc::new(folder)).expect("spawn worker");

        worker.request(LoadRequest {
            name: "img1.png".to_string(),
            token: 1,
        });

        let loaded = wait_for_result(&worker).expect("decode should succeed");
        assert_eq!(loaded.name, "img1.png");
        assert_eq!(loaded.token, 1);
        assert_eq!((loaded.width, loaded.height), (8, 6));
        assert_eq!(loaded.pixels.len(), 8 * 6 * 4);
    }

    #[test]
    fn test_results_arrive_in_request_order() {
        let folder = MemImageFolder::new([
            ("a.png", png_bytes(2, 2)),
            ("b.png", png_bytes(4, 4)),
        ]);
        let worker = ImageLoadWorker::spawn(Arc::new(folder)).expect("spawn worker");

        worker.request(LoadRequest {
            name: "a.png".to_string(),
            token: 1,
        });
        worker.request(LoadRequest {
            name: "b.png".to_string(),
            token: 2,
        });

        let first = wait_for_result(&worker).expect("first decode");
        let second = wait_for_result(&worker).expect("second decode");
        assert_eq!(first.name, "a.png");
        assert_eq!(second.name, "b.png");
    }

    #[test]
    fn test_bad_bytes_report_failure_with_token() {
        let folder = MemImageFolder::new([("broken.png", b"not an image".to_vec())]);
        let worker = ImageLoadWorker::spawn(Arc::new(folder)).expect("spawn worker");

        worker.request(LoadRequest {
            name: "broken.png".to_string(),
            token: 7,
        });

        let failure = wait_for_result(&worker).expect_err("decode should fail");
        assert_eq!(failure.name, "broken.png");
        assert_eq!(failure.token, 7);
    }

    #[test]
    fn test_missing_image_reports_failure() {
        let folder = MemImageFolder::new([]);
        let worker = ImageLoadWorker::spawn(Arc::new(folder)).expect("spawn worker");

        worker.request(LoadRequest {
            name: "ghost.png".to_string(),
            token: 1,
        });

        let failure = wait_for_result(&worker).expect_err("read should fail");
        assert!(failure.message.contains("ghost.png"));
    }
}
