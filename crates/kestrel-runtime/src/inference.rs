//! Inference session management with token streaming
//!
//! Drives a [`Model`](crate::transformer::Model) one position at a time:
//! prompt tokens are fed back verbatim while their positions warm the KV
//! caches, then the session switches to nucleus sampling until a stop
//! token, the context window, or the token budget ends generation.

use std::time::{Duration, Instant};

use kestrel_core::Tokenizer;

use crate::sampling::Sampler;
use crate::transformer::Model;

/// Generation options
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    /// Budget for the whole session, echoed prompt positions included.
    pub max_tokens: usize,
    /// Nucleus mass for sampling, in `(0, 1]`.
    pub top_p: f32,
    /// Fixed RNG seed; `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { max_tokens: 256, top_p: 0.9, seed: None }
    }
}

/// Token generation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// Ready to generate
    Ready,
    /// Currently generating
    Generating,
    /// Generation complete (token budget or context window reached)
    Complete,
    /// Generation stopped (stop token encountered)
    Stopped,
}

/// Timing summary for a finished generation run.
#[derive(Debug, Clone, Copy)]
pub struct GenerationStats {
    /// Tokens the session stepped through, forced prompt tokens included.
    pub tokens: usize,
    /// Wall-clock time spent inside the generation loop.
    pub elapsed: Duration,
}

impl GenerationStats {
    /// Throughput in tokens per second; zero when no time elapsed.
    pub fn tokens_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.tokens as f64 / secs
        } else {
            0.0
        }
    }
}

/// Inference session with streaming support
pub struct InferenceSession {
    /// Input prompt tokens, consumed verbatim before sampling begins
    prompt_tokens: Vec<u32>,
    /// Generation options
    config: GenerationConfig,
    /// Token sampler
    sampler: Sampler,
    /// Current generation state
    state: GenerationState,
    /// Position of the next forward pass
    position: usize,
    /// Token fed to the model at the next step
    current: u32,
    /// Number of tokens stepped through so far
    tokens_generated: usize,
    /// Stop tokens to detect
    stop_tokens: Vec<u32>,
}

impl InferenceSession {
    /// Create a new inference session over an already-encoded prompt.
    ///
    /// The prompt must open with the start-of-sequence token; the model
    /// never sees a position without an input token.
    pub fn new(prompt_tokens: Vec<u32>, config: GenerationConfig) -> Self {
        assert!(!prompt_tokens.is_empty(), "prompt must contain at least the start token");
        let sampler = match config.seed {
            Some(seed) => Sampler::with_seed(seed),
            None => Sampler::new(),
        };
        let current = prompt_tokens[0];
        Self {
            prompt_tokens,
            config,
            sampler,
            state: GenerationState::Ready,
            position: 0,
            current,
            tokens_generated: 0,
            stop_tokens: Vec::new(),
        }
    }

    /// Encode `prompt` and build a session that stops on the tokenizer's
    /// sequence markers. `None` starts generation from the bare start token.
    pub fn from_prompt(
        tokenizer: &Tokenizer,
        prompt: Option<&str>,
        config: GenerationConfig,
    ) -> Self {
        let tokens = tokenizer.encode(prompt.unwrap_or(""), true);
        let mut session = Self::new(tokens, config);
        session.set_stop_tokens(vec![tokenizer.bos_token_id(), tokenizer.eos_token_id()]);
        session
    }

    /// Set stop tokens for generation
    pub fn set_stop_tokens(&mut self, stop_tokens: Vec<u32>) {
        self.stop_tokens = stop_tokens;
    }

    /// Get current generation state
    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// Check if generation is complete
    pub fn is_complete(&self) -> bool {
        matches!(self.state, GenerationState::Complete | GenerationState::Stopped)
    }

    /// Get number of tokens stepped through
    pub fn tokens_generated(&self) -> usize {
        self.tokens_generated
    }

    /// Get prompt tokens
    pub fn prompt_tokens(&self) -> &[u32] {
        &self.prompt_tokens
    }

    /// Advance the session by one position.
    ///
    /// While prompt tokens remain the logits are discarded and the next
    /// prompt token is forced; afterwards the logits are softmaxed and
    /// sampled. Returns `None` once the session has finished.
    pub fn next_token(&mut self, model: &mut Model) -> Option<u32> {
        if self.is_complete() {
            return None;
        }
        if self.state == GenerationState::Ready {
            self.state = GenerationState::Generating;
        }

        // The context window bounds the budget: the cache holds seq_len rows.
        let limit = self.config.max_tokens.min(model.config.seq_len);
        if self.position >= limit {
            self.state = GenerationState::Complete;
            return None;
        }

        let x = model.embed(self.current);
        let mut logits = model.forward(x, self.position);

        let next = if self.position + 1 < self.prompt_tokens.len() {
            self.prompt_tokens[self.position + 1]
        } else {
            kestrel_cpu::softmax(logits.as_mut_slice());
            self.sampler.sample_top_p(logits.as_slice(), self.config.top_p) as u32
        };

        if self.stop_tokens.contains(&next) {
            self.state = GenerationState::Stopped;
            return None;
        }

        self.position += 1;
        self.current = next;
        self.tokens_generated += 1;
        Some(next)
    }

    /// Return the session to its initial state: position zero, the first
    /// prompt token pending. A pinned seed also restarts the sampler
    /// stream; an OS-seeded sampler keeps drawing from its own.
    pub fn rewind(&mut self) {
        self.state = GenerationState::Ready;
        self.position = 0;
        self.current = self.prompt_tokens[0];
        self.tokens_generated = 0;
        if let Some(seed) = self.config.seed {
            self.sampler = Sampler::with_seed(seed);
        }
    }

    /// Run the session to completion, streaming each decoded piece into
    /// `on_piece`. The session is rewound and the model's caches cleared
    /// first, so the run replays from position zero even when the session
    /// was stepped by hand or the model served another session.
    pub fn run(
        &mut self,
        model: &mut Model,
        tokenizer: &Tokenizer,
        mut on_piece: impl FnMut(&[u8]),
    ) -> GenerationStats {
        self.rewind();
        model.reset_caches();
        let start = Instant::now();
        let mut prev = self.current;
        while let Some(token) = self.next_token(model) {
            on_piece(&tokenizer.decode_piece(prev, token));
            prev = token;
        }
        let stats = GenerationStats { tokens: self.tokens_generated, elapsed: start.elapsed() };
        log::debug!(
            "generation finished: {:?}, {} tokens in {:.2?}",
            self.state,
            stats.tokens,
            stats.elapsed
        );
        stats
    }
}
