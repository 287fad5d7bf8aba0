use sha2::{Digest, Sha256};

pub fn sha256_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    hex::encode(h.finalize())
}

/// Inputs that decide what the target was asked for one case.
pub struct Context<'a> {
    pub suite: &'a str,
    pub target: &'a str,
    pub indicator: &'a str,
    pub case_id: &'a str,
    pub prompt: &'a str,
}

/// Stable digest of a case's execution context. Two runs with equal
/// fingerprints asked the same question of the same target.
pub fn compute(ctx: Context<'_>) -> String {
    let parts = [
        format!("suite={}", ctx.suite),
        format!("target={}", ctx.target),
        format!("indicator={}", ctx.indicator),
        format!("case_id={}", ctx.case_id),
        format!("prompt_sha={}", sha256_hex(ctx.prompt)),
    ];
    sha256_hex(&parts.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(prompt: &'a str) -> Context<'a> {
        Context {
            suite: "s",
            target: "m",
            indicator: "opt/rewrite",
            case_id: "c1",
            prompt,
        }
    }

    #[test]
    fn fingerprint_tracks_prompt() {
        assert_eq!(compute(ctx("a")), compute(ctx("a")));
        assert_ne!(compute(ctx("a")), compute(ctx("b")));
        assert_eq!(compute(ctx("a")).len(), 64);
    }
}
