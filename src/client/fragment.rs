// ABOUTME: Plans how message content is packaged into one or more SMS payloads
// ABOUTME: Handles UCS-2 encoding, signature budgets and concatenated-SMS UDH headers

use crate::client::config::ClientConfig;

/// Payload ceiling of a single SMS, in octets.
const SMS_PAYLOAD_MAX: usize = 140;

/// User Data Header for one part of a concatenated SMS:
/// `05 00 03 REF TOTAL SEQ`.
const UDH_LEN: usize = 6;

/// Content budget of one concatenated part once the UDH is accounted for.
const LONG_PART_MAX: usize = SMS_PAYLOAD_MAX - UDH_LEN;

/// Most parts one submission may be split into.
const MAX_PARTS: usize = 8;

/// How one send call is packaged on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragmentMode {
    /// Content fits one SMS
    Single,
    /// Concatenated long SMS; parts share a UDH reference and must all be
    /// delivered
    Concatenated,
    /// Short messages produced by the code-point splitting policy; applies
    /// even when the content happens to fit a single piece, since the
    /// retry rules follow the policy, not the piece count
    Independent,
}

/// One wire payload: the Msg_Content bytes and whether they start with a UDH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FragmentPart {
    pub content: Vec<u8>,
    pub udhi: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FragmentPlan {
    pub mode: FragmentMode,
    pub parts: Vec<FragmentPart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragmentError {
    /// No content to send
    Empty,
    /// More parts than the concatenation header can express usefully
    TooManyParts(usize),
    /// Multiple parts required but long messages are disabled
    LongMessageDisabled,
    /// The signature budget leaves no room for content
    BudgetExhausted,
}

/// Encode text as big-endian UCS-2 (UTF-16BE).
///
/// BMP code points take two octets; supplementary-plane code points take a
/// surrogate pair of four.
pub(crate) fn encode_ucs2(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Decode big-endian UCS-2 bytes back into text.
pub(crate) fn decode_ucs2(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Plan the wire payloads for one send call.
///
/// `reference` is the concatenation reference octet; the caller samples the
/// sequence counter once so every part of a submission shares it.
pub(crate) fn plan(
    content: &str,
    signature: &str,
    config: &ClientConfig,
    reference: u8,
) -> Result<FragmentPlan, FragmentError> {
    if content.is_empty() {
        return Err(FragmentError::Empty);
    }

    if config.send_long_as_short {
        return plan_independent(content, signature, config);
    }

    let encoded = encode_ucs2(content);
    let signature_len = if config.attempt_remove_signature {
        0
    } else {
        encode_ucs2(signature).len()
    };

    if encoded.len() + signature_len <= SMS_PAYLOAD_MAX {
        return Ok(FragmentPlan {
            mode: FragmentMode::Single,
            parts: vec![FragmentPart {
                content: encoded,
                udhi: false,
            }],
        });
    }

    plan_concatenated(encoded, config, reference)
}

/// Split the encoded stream into UDH-prefixed parts of a concatenated SMS.
///
/// The split is byte-exact at the 134-octet boundary; every part except the
/// last carries a full payload.
fn plan_concatenated(
    encoded: Vec<u8>,
    config: &ClientConfig,
    reference: u8,
) -> Result<FragmentPlan, FragmentError> {
    let total = (encoded.len() - 1) / LONG_PART_MAX + 1;
    check_caps(total, config)?;

    let parts = encoded
        .chunks(LONG_PART_MAX)
        .enumerate()
        .map(|(index, chunk)| {
            let mut content = Vec::with_capacity(UDH_LEN + chunk.len());
            content.extend_from_slice(&[0x05, 0x00, 0x03, reference, total as u8, index as u8 + 1]);
            content.extend_from_slice(chunk);
            FragmentPart {
                content,
                udhi: true,
            }
        })
        .collect();

    Ok(FragmentPlan {
        mode: FragmentMode::Concatenated,
        parts,
    })
}

/// Split content into independent short messages on code-point boundaries.
fn plan_independent(
    content: &str,
    signature: &str,
    config: &ClientConfig,
) -> Result<FragmentPlan, FragmentError> {
    let mut budget = SMS_PAYLOAD_MAX;
    if config.prepositive_signature && !config.attempt_remove_signature {
        budget = budget.saturating_sub(encode_ucs2(signature).len());
    }
    if budget < 4 {
        // even a single surrogate-pair character cannot fit
        return Err(FragmentError::BudgetExhausted);
    }

    let mut parts: Vec<FragmentPart> = Vec::new();
    let mut piece = Vec::new();
    for ch in content.chars() {
        let ch_len = ch.len_utf16() * 2;
        if piece.len() + ch_len > budget {
            parts.push(FragmentPart {
                content: std::mem::take(&mut piece),
                udhi: false,
            });
        }
        let mut units = [0u16; 2];
        for unit in ch.encode_utf16(&mut units) {
            piece.extend_from_slice(&unit.to_be_bytes());
        }
    }
    if !piece.is_empty() {
        parts.push(FragmentPart {
            content: piece,
            udhi: false,
        });
    }

    check_caps(parts.len(), config)?;

    Ok(FragmentPlan {
        mode: FragmentMode::Independent,
        parts,
    })
}

fn check_caps(count: usize, config: &ClientConfig) -> Result<(), FragmentError> {
    if count == 0 {
        return Err(FragmentError::Empty);
    }
    if count > MAX_PARTS {
        return Err(FragmentError::TooManyParts(count));
    }
    if count > 1 && config.disable_long_message {
        return Err(FragmentError::LongMessageDisabled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new("127.0.0.1:7890", "109000", "900001", "secret")
    }

    #[test]
    fn ucs2_is_big_endian() {
        assert_eq!(encode_ucs2("hi"), vec![0x00, 0x68, 0x00, 0x69]);
        assert_eq!(encode_ucs2("你"), vec![0x4f, 0x60]);
    }

    #[test]
    fn ucs2_surrogate_pairs() {
        // U+1F600 encodes as a surrogate pair, four octets
        assert_eq!(encode_ucs2("😀"), vec![0xd8, 0x3d, 0xde, 0x00]);
        assert_eq!(decode_ucs2(&encode_ucs2("a😀b")), "a😀b");
    }

    #[test]
    fn empty_content_is_an_error() {
        assert_eq!(plan("", "", &config(), 0), Err(FragmentError::Empty));
    }

    #[test]
    fn short_content_is_single() {
        let plan = plan("hi", "", &config(), 7).unwrap();
        assert_eq!(plan.mode, FragmentMode::Single);
        assert_eq!(plan.parts.len(), 1);
        assert!(!plan.parts[0].udhi);
        assert_eq!(plan.parts[0].content, vec![0x00, 0x68, 0x00, 0x69]);
    }

    #[test]
    fn single_threshold_includes_signature() {
        // 68 chars of content: 136 octets; 3-char signature: 6 octets
        let content = "x".repeat(68);
        let with_signature = plan(&content, "【a】", &config(), 0).unwrap();
        assert_eq!(with_signature.mode, FragmentMode::Concatenated);

        let without = plan(&content, "", &config(), 0).unwrap();
        assert_eq!(without.mode, FragmentMode::Single);
    }

    #[test]
    fn attempt_remove_signature_skips_the_budget() {
        let content = "x".repeat(68);
        let cfg = config().attempt_remove_signature();
        let planned = plan(&content, "【a】", &cfg, 0).unwrap();
        assert_eq!(planned.mode, FragmentMode::Single);
    }

    #[test]
    fn seventy_bmp_chars_still_fit() {
        // 70 * 2 = 140 octets, exactly the ceiling
        let planned = plan(&"你".repeat(70), "", &config(), 0).unwrap();
        assert_eq!(planned.mode, FragmentMode::Single);
        assert_eq!(planned.parts[0].content.len(), 140);
    }

    #[test]
    fn two_hundred_octets_make_two_parts() {
        // 100 BMP chars = 200 octets: 134 + 66
        let planned = plan(&"好".repeat(100), "", &config(), 0x2a).unwrap();
        assert_eq!(planned.mode, FragmentMode::Concatenated);
        assert_eq!(planned.parts.len(), 2);

        let first = &planned.parts[0];
        let second = &planned.parts[1];
        assert!(first.udhi && second.udhi);
        assert_eq!(first.content.len(), 140);
        assert_eq!(second.content.len(), 6 + 66);
        assert_eq!(&first.content[..6], &[0x05, 0x00, 0x03, 0x2a, 2, 1]);
        assert_eq!(&second.content[..6], &[0x05, 0x00, 0x03, 0x2a, 2, 2]);

        // content is contiguous across the split
        let mut rejoined = first.content[6..].to_vec();
        rejoined.extend_from_slice(&second.content[6..]);
        assert_eq!(decode_ucs2(&rejoined), "好".repeat(100));
    }

    #[test]
    fn parts_share_the_reference_byte() {
        let planned = plan(&"好".repeat(300), "", &config(), 0x99).unwrap();
        assert!(planned.parts.len() > 2);
        for (index, part) in planned.parts.iter().enumerate() {
            assert_eq!(part.content[3], 0x99);
            assert_eq!(part.content[4] as usize, planned.parts.len());
            assert_eq!(part.content[5] as usize, index + 1);
        }
    }

    #[test]
    fn long_disabled_rejects_multi_part() {
        let cfg = config().without_long_messages();
        assert_eq!(
            plan(&"好".repeat(100), "", &cfg, 0),
            Err(FragmentError::LongMessageDisabled)
        );
        // single part still passes
        assert!(plan("hi", "", &cfg, 0).is_ok());
    }

    #[test]
    fn more_than_eight_parts_is_too_long(){
        // 8 parts hold 8*134 = 1072 octets = 536 BMP chars
        assert!(plan(&"好".repeat(536), "", &config(), 0).is_ok());
        assert_eq!(
            plan(&"好".repeat(537), "", &config(), 0),
            Err(FragmentError::TooManyParts(9))
        );
    }

    #[test]
    fn independent_mode_splits_on_code_points() {
        let cfg = config().split_long_as_short();
        let content = "好".repeat(100);
        let planned = plan(&content, "", &cfg, 0).unwrap();
        assert_eq!(planned.mode, FragmentMode::Independent);
        assert_eq!(planned.parts.len(), 2);
        // 140-octet budget holds 70 chars
        assert_eq!(planned.parts[0].content.len(), 140);
        assert_eq!(planned.parts[1].content.len(), 60);
        assert!(planned.parts.iter().all(|p| !p.udhi));

        // concatenating the pieces reproduces the content
        let rejoined: String = planned
            .parts
            .iter()
            .map(|p| decode_ucs2(&p.content))
            .collect();
        assert_eq!(rejoined, content);
    }

    #[test]
    fn independent_mode_applies_to_a_single_piece() {
        let cfg = config().split_long_as_short();
        let planned = plan("hi", "", &cfg, 0).unwrap();
        assert_eq!(planned.mode, FragmentMode::Independent);
        assert_eq!(planned.parts.len(), 1);
        assert!(!planned.parts[0].udhi);
    }

    #[test]
    fn independent_mode_reserves_prepositive_signature() {
        let cfg = config().split_long_as_short().with_prepositive_signature();
        // signature "【sig】" is 5 UTF-16 units = 10 octets, budget 130 = 65 chars
        let planned = plan(&"好".repeat(66), "【sig】", &cfg, 0).unwrap();
        assert_eq!(planned.parts.len(), 2);
        assert_eq!(planned.parts[0].content.len(), 130);
        assert_eq!(planned.parts[1].content.len(), 2);
    }

    #[test]
    fn independent_mode_never_splits_a_surrogate_pair() {
        let cfg = config().split_long_as_short();
        // 35 pairs fill the 140-octet budget exactly; the 36th starts a new piece
        let content = "😀".repeat(36);
        let planned = plan(&content, "", &cfg, 0).unwrap();
        assert_eq!(planned.parts.len(), 2);
        assert_eq!(planned.parts[0].content.len(), 140);
        assert_eq!(planned.parts[1].content.len(), 4);
        for part in &planned.parts {
            assert_eq!(part.content.len() % 4, 0);
        }
    }
}
