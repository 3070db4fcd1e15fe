//! 分桶计数展开
//!
//! 把 `(key, count)` 序列展开为 `count` 次重复的 `key`，保持输入顺序，惰性求值。

use contracts::{SyncCount, Tick};

/// Lazy expansion of `(key, count)` pairs into repeated keys
///
/// Output length equals the sum of all counts; zero counts contribute
/// nothing. Negative counts are unrepresentable (`u64`), the sync log
/// parser rejects them before they reach this point.
#[derive(Debug, Clone)]
pub struct BucketExpander<I, K> {
    inner: I,
    current: Option<K>,
    remaining: u64,
}

impl<I, K> BucketExpander<I, K>
where
    I: Iterator<Item = (K, u64)>,
    K: Clone,
{
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            current: None,
            remaining: 0,
        }
    }
}

impl<I, K> Iterator for BucketExpander<I, K>
where
    I: Iterator<Item = (K, u64)>,
    K: Clone,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        while self.remaining == 0 {
            let (key, count) = self.inner.next()?;
            self.current = Some(key);
            self.remaining = count;
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            // Last repetition: hand out the key itself
            self.current.take()
        } else {
            self.current.clone()
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // Unseen pairs may carry any count, including zero
        let pending = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        match self.inner.size_hint() {
            (_, Some(0)) => (pending, Some(pending)),
            _ => (pending, None),
        }
    }
}

/// Expand `(key, count)` pairs lazily
pub fn expand_counts<I, K>(pairs: I) -> BucketExpander<I::IntoIter, K>
where
    I: IntoIterator<Item = (K, u64)>,
    K: Clone,
{
    BucketExpander::new(pairs.into_iter())
}

/// One tick per captured frame, from a sync log
pub fn expand_sync_counts(
    counts: &[SyncCount],
) -> BucketExpander<impl Iterator<Item = (Tick, u64)> + '_, Tick> {
    expand_counts(counts.iter().map(|c| (c.tick, c.frame_count)))
}
