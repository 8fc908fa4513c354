use biblio_core::tokenizer::{is_stopword, normalize, tokenize, tokenize_with, word_count};
use std::collections::HashSet;

#[test]
fn it_folds_accents_and_case() {
    assert_eq!(normalize("Les Misérables"), "les miserables");
    let toks = tokenize("The café's RÉSUMÉ");
    assert_eq!(toks, vec!["cafe", "resume"]);
}

#[test]
fn it_filters_stopwords() {
    let toks = tokenize("The quick brown fox and the lazy dog");
    assert!(!toks.contains(&"the".to_string()));
    assert!(!toks.contains(&"and".to_string()));
    assert!(toks.contains(&"quick".to_string()));
    assert!(is_stopword("the"));
    assert!(!is_stopword("whale"));
}

#[test]
fn it_drops_short_tokens() {
    // one- and two-letter runs never reach the index
    assert_eq!(tokenize("an ox is at sea"), vec!["sea"]);
}

#[test]
fn empty_input_is_an_empty_sequence() {
    assert!(tokenize("").is_empty());
    assert!(tokenize("   \n\t  ").is_empty());
    assert!(tokenize("?!,.;:").is_empty());
    assert_eq!(word_count(""), 0);
}

#[test]
fn it_is_deterministic() {
    let text = "Call me Ishmael. Some years ago—never mind how long precisely.";
    assert_eq!(tokenize(text), tokenize(text));
}

#[test]
fn custom_stopword_set_replaces_the_builtin_list() {
    let stop: HashSet<String> = ["whale".to_string()].into_iter().collect();
    let toks = tokenize_with("the whale and the sea", &stop);
    // "the"/"and" survive because the custom set replaced the default one
    assert_eq!(toks, vec!["the", "and", "sea"]);
}

#[test]
fn word_count_includes_stopwords() {
    let text = "the whale hunted the whale";
    assert_eq!(word_count(text), 5);
    assert_eq!(tokenize(text).len(), 3);
}
