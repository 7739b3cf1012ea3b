//! Interleaved execution: run strands concurrently on one thread and
//! join their results in strand order.
//!
//! Each action becomes its own strand on the runtime's FIFO scheduler.
//! Strands proceed in turn at each suspension: when one awaits, the
//! next ready one runs. The joining strand collects outcomes in the
//! order the actions were given, regardless of completion order.

use crate::cx::Cx;
use crate::error::Result;
use std::future::Future;

impl Cx {
    /// Runs two actions concurrently, returning both outcomes.
    ///
    /// Always waits for both strands; one failing (or being cancelled)
    /// does not abandon the other. The pair is in strand order, not
    /// completion order.
    pub async fn interleavedx<A, B, FA, FutA, FB, FutB>(
        &self,
        a: FA,
        b: FB,
    ) -> (Result<A>, Result<B>)
    where
        A: 'static,
        B: 'static,
        FA: FnOnce(Cx) -> FutA + 'static,
        FutA: Future<Output = Result<A>> + 'static,
        FB: FnOnce(Cx) -> FutB + 'static,
        FutB: Future<Output = Result<B>> + 'static,
    {
        let first = match self.spawn(a) {
            Ok(handle) => handle,
            Err(e) => return (Err(e.clone()), Err(e)),
        };
        let second = match self.spawn(b) {
            Ok(handle) => handle,
            Err(e) => return (Err(e.clone()), Err(e)),
        };
        let ra = first.join(self).await;
        let rb = second.join(self).await;
        (ra, rb)
    }

    /// Runs two actions concurrently, rethrowing the first error in
    /// strand order.
    pub async fn interleaved<A, B, FA, FutA, FB, FutB>(&self, a: FA, b: FB) -> Result<(A, B)>
    where
        A: 'static,
        B: 'static,
        FA: FnOnce(Cx) -> FutA + 'static,
        FutA: Future<Output = Result<A>> + 'static,
        FB: FnOnce(Cx) -> FutB + 'static,
        FutB: Future<Output = Result<B>> + 'static,
    {
        let (ra, rb) = self.interleavedx(a, b).await;
        Ok((ra?, rb?))
    }

    /// Runs any number of actions concurrently, returning all outcomes
    /// in strand order.
    pub async fn interleavedx_all<T, F, Fut>(&self, actions: Vec<F>) -> Vec<Result<T>>
    where
        T: 'static,
        F: FnOnce(Cx) -> Fut + 'static,
        Fut: Future<Output = Result<T>> + 'static,
    {
        let mut handles = Vec::with_capacity(actions.len());
        for action in actions {
            handles.push(self.spawn(action));
        }
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle {
                Ok(handle) => results.push(handle.join(self).await),
                Err(e) => results.push(Err(e)),
            }
        }
        results
    }

    /// Runs any number of actions concurrently, rethrowing the first
    /// error in strand order.
    pub async fn interleaved_all<T, F, Fut>(&self, actions: Vec<F>) -> Result<Vec<T>>
    where
        T: 'static,
        F: FnOnce(Cx) -> Fut + 'static,
        Fut: Future<Output = Result<T>> + 'static,
    {
        self.interleavedx_all(actions).await.into_iter().collect()
    }
}
