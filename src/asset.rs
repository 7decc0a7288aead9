use std::{
    io::Read,
    path::{Path, PathBuf},
};

use log::debug;
use tokio::sync::{oneshot, watch};

/// Bytes read per chunk while reporting progress.
const READ_CHUNK_SIZE: usize = 256 * 1024;

/// An Asset that can be fetched from bytes. The bytes could come from anywhere, e.g. the disk or embedded in the binary, don't care.
pub trait AssetT: Sized + Send + 'static {
    fn from_bytes(bytes: &[u8]) -> Result<Self, anyhow::Error>;

    fn load(path: &Path, progress: &watch::Sender<Progress>) -> Result<Self, anyhow::Error> {
        let bytes = read_with_progress(path, progress)?;
        Self::from_bytes(&bytes)
    }
}

/// Reads a whole file, publishing how many bytes have been read so far.
pub fn read_with_progress(
    path: &Path,
    progress: &watch::Sender<Progress>,
) -> Result<Vec<u8>, anyhow::Error> {
    let mut file = std::fs::File::open(path)?;
    let total = file.metadata().ok().map(|m| m.len()).filter(|len| *len > 0);
    let mut bytes: Vec<u8> = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
        progress.send_replace(Progress {
            loaded: bytes.len() as u64,
            total,
        });
    }
    Ok(bytes)
}

/// How far a load has come. `total` is only known if the source reports its size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    /// Fraction in `[0, 1]`, `None` while the total size is unknown.
    pub fn fraction(&self) -> Option<f32> {
        let total = self.total?;
        if total == 0 {
            return None;
        }
        Some((self.loaded as f64 / total as f64).min(1.0) as f32)
    }

    pub fn percent(&self) -> Option<u32> {
        self.fraction().map(|f| (f * 100.0).round() as u32)
    }
}

/// Outcome of an asynchronous load. Failure is terminal for that asset.
#[derive(Debug)]
pub enum LoadResult<T> {
    Ready(T),
    Failed(anyhow::Error),
}

impl<T> LoadResult<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            LoadResult::Ready(t) => Some(t),
            LoadResult::Failed(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadResult::Ready(_))
    }
}

impl<T> From<Result<T, anyhow::Error>> for LoadResult<T> {
    fn from(value: Result<T, anyhow::Error>) -> Self {
        match value {
            Ok(t) => LoadResult::Ready(t),
            Err(err) => LoadResult::Failed(err),
        }
    }
}

/// Sending half of a [`LoadingAsset`], handed to whatever performs the load.
#[derive(Debug)]
pub struct LoadSender<T> {
    result: oneshot::Sender<LoadResult<T>>,
    progress: watch::Sender<Progress>,
}

impl<T> LoadSender<T> {
    pub fn progress(&self) -> &watch::Sender<Progress> {
        &self.progress
    }

    pub fn finish(self, result: impl Into<LoadResult<T>>) {
        // the receiver may be gone already, nobody cares about the result then.
        _ = self.result.send(result.into());
    }
}

/// A load in flight. Polled from the render loop, never blocks.
#[derive(Debug)]
pub struct LoadingAsset<T> {
    label: String,
    result: Option<oneshot::Receiver<LoadResult<T>>>,
    progress: watch::Receiver<Progress>,
}

impl<T> LoadingAsset<T> {
    pub fn channel(label: impl Into<String>) -> (LoadSender<T>, LoadingAsset<T>) {
        let (result_tx, result_rx) = oneshot::channel();
        let (progress_tx, progress_rx) = watch::channel(Progress::default());
        let sender = LoadSender {
            result: result_tx,
            progress: progress_tx,
        };
        let loading = LoadingAsset {
            label: label.into(),
            result: Some(result_rx),
            progress: progress_rx,
        };
        (sender, loading)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_settled(&self) -> bool {
        self.result.is_none()
    }

    /// Returns the latest progress if it changed since the last call.
    pub fn progress_changed(&mut self) -> Option<Progress> {
        match self.progress.has_changed() {
            Ok(true) => Some(*self.progress.borrow_and_update()),
            _ => None,
        }
    }

    /// Yields the result exactly once, as soon as it is available.
    pub fn poll(&mut self) -> Option<LoadResult<T>> {
        let rx = self.result.as_mut()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => LoadResult::Failed(anyhow::anyhow!(
                "loader for {} stopped without a result",
                self.label
            )),
        };
        self.result = None;
        Some(result)
    }
}

impl<T: AssetT> LoadingAsset<T> {
    /// Starts loading `path` on the blocking pool of `rt`. Fire and forget, there is no cancellation.
    pub fn spawn(rt: &tokio::runtime::Handle, label: impl Into<String>, path: PathBuf) -> Self {
        let (sender, loading) = Self::channel(label);
        debug!("loading {} from {:?}", loading.label, path);
        rt.spawn_blocking(move || {
            let result = T::load(&path, sender.progress());
            sender.finish(result);
        });
        loading
    }
}

/// Join barrier over a fixed number of loads that may settle in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadBarrier {
    expected: usize,
    settled: usize,
}

impl LoadBarrier {
    pub fn new(expected: usize) -> Self {
        LoadBarrier {
            expected,
            settled: 0,
        }
    }

    /// Records one settled load (success or failure). Returns true for the call that completes the barrier.
    pub fn settle(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }
        self.settled += 1;
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.settled >= self.expected
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn settled(&self) -> usize {
        self.settled
    }
}
