//! Flatten pipeline: pre-order walk emitting every node and severing child links.
//!
//! [`FlattenWalk`] is the traversal itself, a lazy single-pass iterator.
//! [`flatten`] runs that walk on a producer thread feeding a bounded channel
//! and collects the entities on the calling thread.

use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, instrument, trace};

use crate::domain::error::{DomainError, FlattenError, FlattenResult, TreeResult};
use crate::domain::traits::Flattenable;

/// Default capacity of the producer/consumer channel.
pub const DEFAULT_BUFFER_SIZE: usize = 128;

/// Cooperative cancellation flag shared between caller and producer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for [`flatten_with`].
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Channel capacity; values below 1 are treated as 1
    pub buffer_size: usize,
    /// Give up waiting for the producer after this long
    pub timeout: Option<Duration>,
    /// Checked by the producer before each node is visited
    pub cancel: Option<CancelToken>,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            timeout: None,
            cancel: None,
        }
    }
}

enum Frame<T> {
    /// Emit the node
    Enter(T),
    /// Read children and schedule them
    Expand(T),
    /// All descendants emitted: sever the children
    Leave(T),
}

/// Lazy pre-order walk over a tree.
///
/// Each node is yielded before its children are read. A node's children are
/// unlinked only after its whole subtree has been yielded. The walk is single
/// pass: once it has run, the tree is detached. After the first error the
/// iterator yields nothing more.
pub struct FlattenWalk<T: Flattenable> {
    stack: Vec<Frame<T>>,
    cancel: Option<CancelToken>,
}

impl<T: Flattenable> FlattenWalk<T> {
    pub fn new(root: T) -> Self {
        Self {
            stack: vec![Frame::Enter(root)],
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Option<CancelToken>) -> Self {
        self.cancel = cancel;
        self
    }

    fn fail(&mut self, err: DomainError) -> Option<TreeResult<T>> {
        self.stack.clear();
        Some(Err(err))
    }
}

impl<T: Flattenable> Iterator for FlattenWalk<T> {
    type Item = TreeResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Enter(node) => {
                    if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                        return self.fail(DomainError::Cancelled);
                    }
                    self.stack.push(Frame::Expand(node.clone()));
                    return Some(Ok(node));
                }
                Frame::Expand(node) => {
                    let children = match node.children() {
                        Ok(children) => children,
                        Err(e) => return self.fail(DomainError::ChildAccess(e)),
                    };
                    trace!(children = children.len(), "expand node");
                    self.stack.push(Frame::Leave(node));
                    self.stack.extend(children.into_iter().rev().map(Frame::Enter));
                }
                Frame::Leave(node) => {
                    if let Err(e) = node.unlink_children() {
                        return self.fail(DomainError::ChildAccess(e));
                    }
                }
            }
        }
        None
    }
}

impl<T: Flattenable> FusedIterator for FlattenWalk<T> {}

/// Flatten the tree below `root` with default options.
pub fn flatten<T>(root: T) -> FlattenResult<T>
where
    T: Flattenable + Send,
{
    flatten_with(root, &FlattenOptions::default())
}

/// Flatten the tree below `root` into a pre-order sequence, root first.
///
/// The walk runs on one scoped producer thread pushing into a bounded channel
/// of `options.buffer_size`; the calling thread drains it. On error, entities
/// already emitted have been detached from their parents; they are handed
/// back in [`FlattenError::emitted`].
#[instrument(level = "debug", skip_all, fields(buffer_size = options.buffer_size))]
pub fn flatten_with<T>(root: T, options: &FlattenOptions) -> FlattenResult<T>
where
    T: Flattenable + Send,
{
    let capacity = options.buffer_size.max(1);
    let (sink, source) = flume::bounded(capacity);
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let walk = FlattenWalk::new(root).with_cancel(options.cancel.clone());

    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        let stop = &stop;
        let producer = s.spawn(move || produce(walk, sink, stop));

        let mut entities = Vec::with_capacity(capacity);
        let timed_out = !consume(&source, deadline, &mut entities);
        if timed_out {
            // the producer hangs up after its next send
            stop.store(true, Ordering::Release);
            entities.extend(source.iter());
        }

        let produced = producer
            .join()
            .unwrap_or(Err(DomainError::ProducerPanicked));

        let failure = if timed_out {
            Some(DomainError::Timeout(options.timeout.unwrap_or_default()))
        } else {
            produced.err()
        };

        match failure {
            Some(cause) => {
                debug!(emitted = entities.len(), error = %cause, "flatten failed");
                Err(FlattenError {
                    emitted: entities,
                    source: cause,
                })
            }
            None => {
                debug!(entities = entities.len(), "flatten complete");
                Ok(entities)
            }
        }
    })
}

fn produce<T: Flattenable>(walk: FlattenWalk<T>, sink: Sender<T>, stop: &AtomicBool) -> TreeResult<()> {
    for entity in walk {
        if sink.send(entity?).is_err() {
            debug!("consumer gone, stopping walk");
            break;
        }
        if stop.load(Ordering::Acquire) {
            debug!("deadline passed, stopping walk");
            break;
        }
    }
    Ok(())
}

/// Drain `source` into `out` until the channel closes.
///
/// Returns `false` if `deadline` passed first.
fn consume<T>(source: &Receiver<T>, deadline: Option<Instant>, out: &mut Vec<T>) -> bool {
    loop {
        let received = match deadline {
            Some(deadline) => source.recv_deadline(deadline),
            None => source.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(entity) => out.push(entity),
            Err(RecvTimeoutError::Disconnected) => return true,
            Err(RecvTimeoutError::Timeout) => return false,
        }
    }
}
