use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[a-z]+").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Tokens shorter than this never reach the index.
const MIN_TOKEN_LEN: usize = 3;

/// Fold text the way the index expects it: NFKD decomposition, accents and
/// other non-ASCII stripped, lowercase.
pub fn normalize(text: &str) -> String {
    text.nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase()
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

fn raw_tokens(normalized: &str) -> impl Iterator<Item = &str> {
    TOKEN
        .find_iter(normalized)
        .map(|m| m.as_str())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
}

/// Tokenize text into normalized index terms: maximal lowercase letter runs
/// of three chars or more, stopwords removed. Deterministic; empty or
/// whitespace-only input yields an empty sequence.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    raw_tokens(&normalized)
        .filter(|t| !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Same pipeline with a caller-supplied stopword set.
pub fn tokenize_with(text: &str, stopwords: &HashSet<String>) -> Vec<String> {
    let normalized = normalize(text);
    raw_tokens(&normalized)
        .filter(|t| !stopwords.contains(*t))
        .map(str::to_string)
        .collect()
}

/// Token count before stopword filtering; used for the books table and the
/// fetcher's minimum-length gate.
pub fn word_count(text: &str) -> u64 {
    let normalized = normalize(text);
    raw_tokens(&normalized).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("The whale hunted the white whale!");
        assert_eq!(t, vec!["whale", "hunted", "white", "whale"]);
    }

    #[test]
    fn word_count_keeps_stopwords() {
        // "the" is a stopword but still three letters long
        assert_eq!(word_count("the whale"), 2);
        assert_eq!(tokenize("the whale").len(), 1);
    }
}
