//! Constrained beam-search decoding over a step function
//!
//! The decoder is abstracted as a closure that receives the live sequences
//! (all the same length) and returns one log-probability row per sequence
//! over the vocabulary. This keeps the search independent of the tensor
//! runtime so it can be exercised with synthetic distributions.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::{CaptionError, CaptionResult};

/// Beam search settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamSearchConfig {
    /// Number of hypotheses kept per step
    pub beam_width: usize,
    /// Maximum sequence length, start token included
    pub max_length: usize,
    pub bos_token_id: u32,
    pub eos_token_id: u32,
    /// Exponent applied to the sequence length when ranking finished hypotheses
    pub length_penalty: f32,
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    log_prob: f32,
}

#[derive(Debug, Clone)]
struct Finished {
    tokens: Vec<u32>,
    score: f32,
}

fn normalized(log_prob: f32, len: usize, length_penalty: f32) -> f32 {
    log_prob / (len as f32).powf(length_penalty)
}

/// Indices of the `k` largest entries, best first
fn top_k(row: &[f32], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..row.len()).collect();
    let by_score_desc = |a: &usize, b: &usize| row[*b].total_cmp(&row[*a]);

    if k < indices.len() {
        indices.select_nth_unstable_by(k, by_score_desc);
        indices.truncate(k);
    }
    indices.sort_by(by_score_desc);
    indices
}

/// Run beam search and return the generated tokens, without the start and
/// end tokens.
pub fn beam_search<F>(config: &BeamSearchConfig, mut step: F) -> CaptionResult<Vec<u32>>
where
    F: FnMut(&[Vec<u32>]) -> CaptionResult<Vec<Vec<f32>>>,
{
    let beam_width = config.beam_width.max(1);
    let mut live = vec![Hypothesis {
        tokens: vec![config.bos_token_id],
        log_prob: 0.0,
    }];
    let mut finished: Vec<Finished> = Vec::new();

    while !live.is_empty() && live[0].tokens.len() < config.max_length {
        let sequences: Vec<Vec<u32>> = live.iter().map(|h| h.tokens.clone()).collect();
        let rows = step(&sequences)?;
        if rows.len() != live.len() {
            return Err(CaptionError::Decoding(format!(
                "decoder returned {} rows for {} beams",
                rows.len(),
                live.len()
            )));
        }

        let mut candidates: Vec<(usize, u32, f32)> =
            Vec::with_capacity(live.len() * 2 * beam_width);
        for (beam, row) in rows.iter().enumerate() {
            for token in top_k(row, 2 * beam_width) {
                candidates.push((beam, token as u32, live[beam].log_prob + row[token]));
            }
        }
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

        let mut next = Vec::with_capacity(beam_width);
        for (rank, (beam, token, log_prob)) in candidates.into_iter().enumerate() {
            if !log_prob.is_finite() {
                continue;
            }
            if token == config.eos_token_id {
                // end tokens outside the top ranks do not open a hypothesis
                if rank < beam_width {
                    let len = live[beam].tokens.len() + 1;
                    finished.push(Finished {
                        tokens: live[beam].tokens.clone(),
                        score: normalized(log_prob, len, config.length_penalty),
                    });
                }
                continue;
            }

            let mut tokens = live[beam].tokens.clone();
            tokens.push(token);
            next.push(Hypothesis { tokens, log_prob });
            if next.len() == beam_width {
                break;
            }
        }

        finished.sort_by(|a, b| b.score.total_cmp(&a.score));
        finished.truncate(beam_width);
        live = next;

        if finished.len() == beam_width {
            let worst_finished = finished[beam_width - 1].score;
            let best_live = live
                .first()
                .map(|h| normalized(h.log_prob, h.tokens.len(), config.length_penalty))
                .unwrap_or(f32::NEG_INFINITY);
            if worst_finished >= best_live {
                break;
            }
        }
    }

    // hypotheses still open at the length limit compete with finished ones
    for h in live {
        let score = normalized(h.log_prob, h.tokens.len(), config.length_penalty);
        finished.push(Finished {
            tokens: h.tokens,
            score,
        });
    }

    let best = finished
        .into_iter()
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));

    let tokens = match best {
        Some(best) => best.tokens.into_iter().skip(1).collect::<Vec<_>>(),
        None => Vec::new(),
    };
    debug!("Beam search produced {} tokens", tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOS: u32 = 0;
    const A: u32 = 1;
    const B: u32 = 2;
    const EOS: u32 = 3;

    fn config(beam_width: usize, max_length: usize) -> BeamSearchConfig {
        BeamSearchConfig {
            beam_width,
            max_length,
            bos_token_id: BOS,
            eos_token_id: EOS,
            length_penalty: 1.0,
        }
    }

    fn ln(probs: [f32; 4]) -> Vec<f32> {
        probs.iter().map(|p| p.ln()).collect()
    }

    /// Greedy picks A first but "B <eos>" is the more likely sequence.
    fn trap_distribution(sequences: &[Vec<u32>]) -> CaptionResult<Vec<Vec<f32>>> {
        Ok(sequences
            .iter()
            .map(|seq| match seq.last() {
                Some(&A) => ln([0.0, 0.3, 0.3, 0.4]),
                Some(&B) => ln([0.0, 0.05, 0.05, 0.9]),
                _ => ln([0.0, 0.5, 0.4, 0.1]),
            })
            .collect())
    }

    #[test]
    fn test_beam_finds_better_sequence_than_greedy() {
        let tokens = beam_search(&config(2, 10), trap_distribution).unwrap();
        assert_eq!(tokens, vec![B]);
    }

    #[test]
    fn test_width_one_is_greedy() {
        let tokens = beam_search(&config(1, 10), trap_distribution).unwrap();
        assert_eq!(tokens, vec![A]);
    }

    #[test]
    fn test_max_length_caps_output() {
        let never_ends = |seqs: &[Vec<u32>]| -> CaptionResult<Vec<Vec<f32>>> {
            Ok(seqs.iter().map(|_| ln([0.0, 0.6, 0.39, 0.01])).collect())
        };
        let tokens = beam_search(&config(5, 5), never_ends).unwrap();
        // start token counts toward the limit
        assert_eq!(tokens.len(), 4);
        assert!(tokens.iter().all(|t| *t != EOS && *t != BOS));
    }

    #[test]
    fn test_sequences_share_length_and_respect_width() {
        let mut calls = 0;
        let tokens = beam_search(&config(3, 8), |seqs: &[Vec<u32>]| {
            calls += 1;
            assert!(seqs.len() <= 3);
            assert!(seqs.iter().all(|s| s.len() == seqs[0].len() && s[0] == BOS));
            Ok(seqs.iter().map(|_| ln([0.0, 0.45, 0.45, 0.1])).collect())
        })
        .unwrap();
        assert!(calls > 0);
        assert!(tokens.len() <= 7);
    }

    #[test]
    fn test_immediate_end_token_yields_empty_caption() {
        let ends_now = |seqs: &[Vec<u32>]| -> CaptionResult<Vec<Vec<f32>>> {
            Ok(seqs.iter().map(|_| ln([0.0, 0.01, 0.01, 0.98])).collect())
        };
        let tokens = beam_search(&config(1, 50), ends_now).unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_step_error_propagates() {
        let failing = |_: &[Vec<u32>]| -> CaptionResult<Vec<Vec<f32>>> {
            Err(CaptionError::Tokenizer("boom".to_string()))
        };
        assert!(beam_search(&config(5, 50), failing).is_err());
    }

    #[test]
    fn test_top_k_orders_best_first() {
        let row = [0.1, 0.7, -1.0, 0.5, 0.6];
        assert_eq!(top_k(&row, 3), vec![1, 4, 3]);
        assert_eq!(top_k(&row, 10).len(), 5);
    }
}
