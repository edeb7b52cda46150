//! The three context hashes, computed over sorted canonical-form dependency
//! lists. `blake3` is keyless and fast; nothing here needs cryptographic
//! collision resistance, only a stable fingerprint.

use forge_domain::{ContextHash, Nsvc};

/// `ref_build_context` — over references only: `name:stream` pairs, sorted.
pub fn ref_build_context(refs: &[(String, String)]) -> ContextHash {
    let mut sorted: Vec<String> = refs.iter().map(|(n, s)| format!("{n}:{s}")).collect();
    sorted.sort();
    hash_lines(&sorted)
}

/// `build_context` / `runtime_context` — over full NSVCs, sorted.
pub fn nsvc_context(nsvcs: &[Nsvc]) -> ContextHash {
    let mut sorted: Vec<String> = nsvcs.iter().map(|n| n.to_string()).collect();
    sorted.sort();
    hash_lines(&sorted)
}

/// The public `context`: first 8 hex chars of `blake3(build || runtime)`.
pub fn public_context(build: &ContextHash, runtime: &ContextHash) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(build.as_str().as_bytes());
    hasher.update(runtime.as_str().as_bytes());
    hasher.finalize().to_hex()[..8].to_string()
}

fn hash_lines(lines: &[String]) -> ContextHash {
    let mut hasher = blake3::Hasher::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    ContextHash(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_insensitive_to_input_ordering() {
        let a = nsvc_context(&[Nsvc::new("platform", "f29", 3, "abc"), Nsvc::new("foo", "1", 1, "xyz")]);
        let b = nsvc_context(&[Nsvc::new("foo", "1", 1, "xyz"), Nsvc::new("platform", "f29", 3, "abc")]);
        assert_eq!(a, b);
    }

    #[test]
    fn public_context_is_eight_hex_chars() {
        let build = nsvc_context(&[Nsvc::new("platform", "f29", 3, "abc")]);
        let runtime = nsvc_context(&[]);
        let ctx = public_context(&build, &runtime);
        assert_eq!(ctx.len(), 8);
        assert!(ctx.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
