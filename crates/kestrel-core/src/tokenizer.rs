//! Tokenizer for text encoding/decoding.
//!
//! BPE over a scored vocabulary in the flat llama2.c `tokenizer.bin`
//! layout: a leading `i32` maximum piece length, then one record per piece
//! of `[f32 score][i32 byte length][bytes]` until end of file. Piece ids
//! are assigned in file order.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Special tokens used by the tokenizer
#[derive(Debug, Clone)]
pub struct SpecialTokens {
    pub bos_token_id: u32,
    pub eos_token_id: u32,
    pub unk_token_id: u32,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self { bos_token_id: 1, eos_token_id: 2, unk_token_id: 0 }
    }
}

/// BPE tokenizer with a scored vocabulary
#[derive(Debug, Clone)]
pub struct Tokenizer {
    /// Piece text by token id
    pieces: Vec<String>,
    /// Merge score by token id
    scores: Vec<f32>,
    /// Piece text -> token id (lowest id wins on duplicates)
    lookup: HashMap<String, u32>,
    special_tokens: SpecialTokens,
    max_piece_len: usize,
}

impl Tokenizer {
    /// Builds a tokenizer from parallel piece and score lists.
    pub fn new(pieces: Vec<String>, scores: Vec<f32>, special_tokens: SpecialTokens) -> Self {
        assert_eq!(
            pieces.len(),
            scores.len(),
            "{} pieces but {} scores",
            pieces.len(),
            scores.len()
        );
        let mut lookup = HashMap::with_capacity(pieces.len());
        for (id, piece) in pieces.iter().enumerate() {
            lookup.entry(piece.clone()).or_insert(id as u32);
        }
        let max_piece_len = pieces.iter().map(|p| p.len()).max().unwrap_or(0);
        Self { pieces, scores, lookup, special_tokens, max_piece_len }
    }

    /// Reads a scored vocabulary stream to end of file.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        let max_piece_len = i32::from_le_bytes(buf);
        if max_piece_len < 1 {
            return Err(Error::ParseError(format!(
                "max piece length must be positive, got {}",
                max_piece_len
            )));
        }
        let max_piece_len = max_piece_len as usize;

        let mut pieces = Vec::new();
        let mut scores = Vec::new();
        let mut score_buf = [0u8; 4];
        while read_record_start(&mut reader, &mut score_buf)? {
            let score = f32::from_le_bytes(score_buf);
            reader.read_exact(&mut buf)?;
            let len = i32::from_le_bytes(buf);
            if len < 0 || len as usize > max_piece_len {
                return Err(Error::ParseError(format!(
                    "piece {} has length {} outside 0..={}",
                    pieces.len(),
                    len,
                    max_piece_len
                )));
            }
            let mut bytes = vec![0u8; len as usize];
            reader.read_exact(&mut bytes)?;
            let piece = String::from_utf8(bytes).map_err(|e| {
                Error::ParseError(format!("piece {} is not UTF-8: {}", pieces.len(), e))
            })?;
            scores.push(score);
            pieces.push(piece);
        }

        log::debug!("loaded {} vocabulary pieces", pieces.len());
        let mut tokenizer = Self::new(pieces, scores, SpecialTokens::default());
        tokenizer.max_piece_len = tokenizer.max_piece_len.max(max_piece_len);
        Ok(tokenizer)
    }

    /// Loads a vocabulary file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Encodes text into token ids.
    ///
    /// Characters are looked up whole, fall back to their UTF-8 bytes as
    /// `<0xXX>` pieces, and finally to the unknown token. Adjacent pieces
    /// are then merged greedily, highest score first, until no adjacent
    /// pair forms a known piece.
    pub fn encode(&self, text: &str, add_bos: bool) -> Vec<u32> {
        let mut tokens = Vec::new();
        if add_bos {
            tokens.push(self.special_tokens.bos_token_id);
        }
        if text.is_empty() {
            return tokens;
        }

        // Leading space marker, mirroring sentencepiece's dummy prefix.
        if let Some(&space) = self.lookup.get(" ") {
            tokens.push(space);
        }

        let normalized: String = text.nfc().collect();
        let mut char_buf = [0u8; 4];
        for ch in normalized.chars() {
            let piece = ch.encode_utf8(&mut char_buf);
            match self.lookup.get(piece) {
                Some(&id) => tokens.push(id),
                None => {
                    for &byte in piece.as_bytes() {
                        match self.lookup.get(&format!("<0x{:02X}>", byte)) {
                            Some(&id) => tokens.push(id),
                            None => tokens.push(self.special_tokens.unk_token_id),
                        }
                    }
                }
            }
        }

        loop {
            let mut best: Option<(f32, usize, u32)> = None;
            for i in 0..tokens.len().saturating_sub(1) {
                let first = &self.pieces[tokens[i] as usize];
                let second = &self.pieces[tokens[i + 1] as usize];
                if first.len() + second.len() > self.max_piece_len {
                    continue;
                }
                let merged = [first.as_str(), second.as_str()].concat();
                if let Some(&id) = self.lookup.get(&merged) {
                    let score = self.scores[id as usize];
                    if best.map_or(true, |(top, _, _)| score > top) {
                        best = Some((score, i, id));
                    }
                }
            }
            match best {
                Some((_, i, id)) => {
                    tokens[i] = id;
                    tokens.remove(i + 1);
                }
                None => break,
            }
        }

        tokens
    }

    /// Decodes a full token sequence, skipping BOS and EOS.
    pub fn decode(&self, token_ids: &[u32]) -> String {
        let mut bytes = Vec::new();
        let mut prev = self.special_tokens.bos_token_id;
        for &id in token_ids {
            if id == self.special_tokens.bos_token_id || id == self.special_tokens.eos_token_id {
                prev = id;
                continue;
            }
            bytes.extend_from_slice(&self.decode_piece(prev, id));
            prev = id;
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Renders one token as raw bytes for streaming output.
    ///
    /// When `prev` is the BOS token the sequence is just starting, so one
    /// leading space marker is dropped from the piece. `<0xXX>` pieces
    /// render as their single byte.
    pub fn decode_piece(&self, prev: u32, id: u32) -> Vec<u8> {
        assert!(
            (id as usize) < self.pieces.len(),
            "token id {} out of range ({} pieces)",
            id,
            self.pieces.len()
        );
        let mut piece = self.pieces[id as usize].as_str();
        if prev == self.special_tokens.bos_token_id {
            piece = piece.strip_prefix(' ').unwrap_or(piece);
        }
        if let Some(byte) = parse_byte_piece(piece) {
            return vec![byte];
        }
        piece.as_bytes().to_vec()
    }

    pub fn vocab_size(&self) -> usize {
        self.pieces.len()
    }

    pub fn bos_token_id(&self) -> u32 {
        self.special_tokens.bos_token_id
    }

    pub fn eos_token_id(&self) -> u32 {
        self.special_tokens.eos_token_id
    }

    pub fn token_to_id(&self, piece: &str) -> Option<u32> {
        self.lookup.get(piece).copied()
    }

    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.pieces.get(id as usize).map(|p| p.as_str())
    }

    pub fn special_tokens(&self) -> &SpecialTokens {
        &self.special_tokens
    }
}

/// Reads the first field of a record, distinguishing a clean end of file
/// from a mid-record truncation.
fn read_record_start<R: Read>(reader: &mut R, buf: &mut [u8; 4]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(Error::ParseError("vocabulary file truncated mid-record".into()));
        }
        filled += n;
    }
    Ok(true)
}

fn parse_byte_piece(piece: &str) -> Option<u8> {
    let hex = piece.strip_prefix("<0x")?.strip_suffix('>')?;
    u8::from_str_radix(hex, 16).ok()
}
