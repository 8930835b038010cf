//! Guarded handlers and first-match chains.

use futures::future::BoxFuture;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

type Guard<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;
type Run<I, C, O> = Arc<dyn Fn(I, C) -> BoxFuture<'static, O> + Send + Sync>;

/// A (guard, function) pair.
///
/// `I` is what the chain resolves over (a stanza, or a stanza together with
/// the current state), `C` the context handed to the function and `O` what
/// it produces.
pub struct Handler<I, C, O> {
    name: Cow<'static, str>,
    guard: Guard<I>,
    run: Run<I, C, O>,
}

impl<I, C, O> Handler<I, C, O> {
    pub fn new<G, F, Fut>(name: impl Into<Cow<'static, str>>, guard: G, run: F) -> Self
    where
        G: Fn(&I) -> bool + Send + Sync + 'static,
        F: Fn(I, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        Handler {
            name: name.into(),
            guard: Arc::new(guard),
            run: Arc::new(move |input, cx| Box::pin(run(input, cx))),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn accepts(&self, input: &I) -> bool {
        (self.guard)(input)
    }

    pub fn call(&self, input: I, cx: C) -> BoxFuture<'static, O> {
        (self.run)(input, cx)
    }
}

impl<I, C, O> Clone for Handler<I, C, O> {
    fn clone(&self) -> Self {
        Handler {
            name: self.name.clone(),
            guard: Arc::clone(&self.guard),
            run: Arc::clone(&self.run),
        }
    }
}

impl<I, C, O> std::fmt::Debug for Handler<I, C, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}

/// Outcome of resolving an input against a chain.
#[derive(Debug)]
pub enum Resolution<I, O> {
    Matched(O),
    /// No guard accepted; the input comes back untouched.
    NoMatch(I),
}

impl<I, O> Resolution<I, O> {
    #[inline]
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }

    #[must_use]
    pub fn matched(self) -> Option<O> {
        match self {
            Resolution::Matched(out) => Some(out),
            Resolution::NoMatch(_) => None,
        }
    }
}

/// Ordered handlers for one stanza category. Position is priority.
pub struct HandlerChain<I, C, O> {
    handlers: Vec<Handler<I, C, O>>,
}

impl<I, C, O> HandlerChain<I, C, O> {
    #[must_use]
    pub fn new() -> Self {
        HandlerChain {
            handlers: Vec::new(),
        }
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, handler: Handler<I, C, O>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Appends at lowest priority.
    pub fn push(&mut self, handler: Handler<I, C, O>) {
        self.handlers.push(handler);
    }

    /// Appends every handler of `other` after the existing ones.
    pub fn extend(&mut self, other: HandlerChain<I, C, O>) {
        self.handlers.extend(other.handlers);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(Handler::name)
    }

    /// First handler whose guard accepts `input`.
    #[must_use]
    pub fn select(&self, input: &I) -> Option<&Handler<I, C, O>> {
        self.handlers.iter().find(|h| h.accepts(input))
    }

    /// Runs the first accepting handler, or hands `input` back.
    ///
    /// Guards are consulted in order and each at most once; nothing runs
    /// after the first match.
    pub async fn resolve(&self, input: I, cx: C) -> Resolution<I, O> {
        match self.select(&input) {
            Some(handler) => Resolution::Matched(handler.call(input, cx).await),
            None => Resolution::NoMatch(input),
        }
    }
}

impl<I, C, O> Default for HandlerChain<I, C, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, C, O> Clone for HandlerChain<I, C, O> {
    fn clone(&self) -> Self {
        HandlerChain {
            handlers: self.handlers.clone(),
        }
    }
}

impl<I, C, O> std::fmt::Debug for HandlerChain<I, C, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Chain = HandlerChain<u32, (), &'static str>;

    fn constant(name: &'static str, guard: fn(&u32) -> bool) -> Handler<u32, (), &'static str> {
        Handler::new(name, guard, move |_, _| async move { name })
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let chain = Chain::new()
            .with(constant("even", |n| n % 2 == 0))
            .with(constant("any", |_| true))
            .with(constant("four", |n| *n == 4));

        assert_eq!(chain.resolve(4, ()).await.matched(), Some("even"));
        assert_eq!(chain.resolve(3, ()).await.matched(), Some("any"));
    }

    #[tokio::test]
    async fn test_empty_chain_is_no_match() {
        let chain = Chain::new();
        assert!(chain.is_empty());
        match chain.resolve(7, ()).await {
            Resolution::NoMatch(input) => assert_eq!(input, 7),
            Resolution::Matched(_) => panic!("empty chain matched"),
        }
    }

    #[tokio::test]
    async fn test_no_match_returns_input() {
        let chain = Chain::new().with(constant("big", |n| *n > 100));
        let res = chain.resolve(5, ()).await;
        assert!(!res.is_match());
        assert!(matches!(res, Resolution::NoMatch(5)));
    }

    #[tokio::test]
    async fn test_each_guard_consulted_once_and_stops_at_match() {
        let calls = Arc::new([AtomicUsize::new(0), AtomicUsize::new(0), AtomicUsize::new(0)]);
        let mut chain: HandlerChain<u32, (), usize> = HandlerChain::new();
        for idx in 0..3 {
            let calls = Arc::clone(&calls);
            chain.push(Handler::new(
                format!("h{idx}"),
                move |n: &u32| {
                    calls[idx].fetch_add(1, Ordering::SeqCst);
                    *n as usize == idx
                },
                move |_, _| async move { idx },
            ));
        }

        assert_eq!(chain.resolve(1, ()).await.matched(), Some(1));
        assert_eq!(calls[0].load(Ordering::SeqCst), 1);
        assert_eq!(calls[1].load(Ordering::SeqCst), 1);
        assert_eq!(calls[2].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut own = Chain::new().with(constant("a", |_| true));
        let appended = Chain::new()
            .with(constant("b", |_| true))
            .with(constant("c", |_| true));
        own.extend(appended);
        assert_eq!(own.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(format!("{own:?}"), "[\"a\", \"b\", \"c\"]");
    }

    #[tokio::test]
    async fn test_context_is_passed() {
        let chain: HandlerChain<u32, u32, u32> =
            HandlerChain::new().with(Handler::new("add", |_: &u32| true, |n, cx| async move { n + cx }));
        assert_eq!(chain.resolve(2, 40).await.matched(), Some(42));
    }
}
