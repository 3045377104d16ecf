//! Voice registry for the synthesis server.
//!
//! The registry is a fixed, server-declared list of speaker names. It is advisory only:
//! it backs voice listings and lets callers pick a sensible default, but it never rejects
//! a request. Whether an unknown name can be synthesized is up to the model backend.

/// Registered speakers, sorted by name for binary search.
const VOICES: &[&str] = &["Chelsie", "Ethan", "Vivian"];

/// Speaker used when a request names none.
pub const DEFAULT_VOICE: &str = "Vivian";

/// All registered speaker names.
pub fn all_voices() -> &'static [&'static str] {
    VOICES
}

/// Check whether a speaker is registered using binary search O(log n).
pub fn is_registered(name: &str) -> bool {
    VOICES.binary_search(&name).is_ok()
}

/// Registered speakers as owned strings (for JSON bodies).
pub fn voice_names() -> Vec<String> {
    VOICES.iter().map(|v| v.to_string()).collect()
}

/// Print all registered voices.
pub fn print_voices() {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Qwen3 TTS - {} Voices", VOICES.len());
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    for name in VOICES {
        let marker = if *name == DEFAULT_VOICE { " (default)" } else { "" };
        println!("  {}{}", name, marker);
    }

    println!("\n{}\n", "─".repeat(70));
    println!("Usage:");
    println!("  ./tts-relay --speaker Vivian \"你好\"");
    println!("  ./tts-relay --speaker Ethan --speed 1.2 \"Hello there\"");
    println!();
    println!("Unregistered names are passed through; the model decides whether to accept them.");
}

/// Print detailed information about a specific voice.
pub fn print_voice_info(name: &str) -> anyhow::Result<()> {
    if !is_registered(name) {
        anyhow::bail!("Voice '{}' not found. Run with --list-voices to see available voices", name);
    }

    println!();
    println!("Voice: {}", name);
    println!("{}", "─".repeat(40));
    println!("Default:       {}", if name == DEFAULT_VOICE { "yes" } else { "no" });
    println!();
    println!("Usage:");
    println!("  ./tts-relay --speaker {} \"你好\"", name);
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_sorted() {
        let mut sorted = VOICES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, VOICES);
    }

    #[test]
    fn test_is_registered() {
        assert!(is_registered("Vivian"));
        assert!(is_registered("Ethan"));
        assert!(!is_registered("vivian"));
        assert!(!is_registered("Nobody"));
        assert!(is_registered(DEFAULT_VOICE));
    }

    #[test]
    fn test_voice_info_unknown() {
        assert!(print_voice_info("Nobody").is_err());
    }
}
