#[cfg(test)]
mod verify {
    use markercheck::language::*;
    use markercheck::parsing::tokenize;
    use markercheck::stylesheet::{parse_stylesheet, MarkerCatalog};

    fn catalog() -> MarkerCatalog {
        parse_stylesheet(include_str!("../usfm.sty")).catalog
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn simple_book() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\id GEN\n\\p\n\\v 1 Hello\n", false);

        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Book,
                TokenKind::Paragraph,
                TokenKind::Verse,
                TokenKind::Text
            ]
        );
        assert_eq!(tokens[0].data, vec!["GEN"]);
        assert_eq!(tokens[2].data, vec!["1"]);
        assert_eq!(
            tokens[3]
                .text
                .as_deref(),
            Some("Hello ")
        );
    }

    #[test]
    fn whitespace_collapses() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p\nA  B\tC\n\\p", false);

        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Paragraph, TokenKind::Text, TokenKind::Paragraph]
        );
        assert_eq!(
            tokens[1]
                .text
                .as_deref(),
            Some("A B C ")
        );
    }

    #[test]
    fn zero_width_space_before_whitespace_dropped() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p\na\u{200B} b\n", false);

        assert_eq!(
            tokens[1]
                .text
                .as_deref(),
            Some("a b ")
        );
    }

    #[test]
    fn ideographic_space_is_kept() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p\na\u{3000}b", false);

        assert_eq!(
            tokens[1]
                .text
                .as_deref(),
            Some("a\u{3000}b")
        );
    }

    #[test]
    fn character_span() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p\nhi \\bd there\\bd*!", false);

        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Paragraph,
                TokenKind::Text,
                TokenKind::Character,
                TokenKind::Text,
                TokenKind::End,
                TokenKind::Text
            ]
        );
        assert_eq!(
            tokens[2]
                .end_marker
                .as_deref(),
            Some("bd*")
        );
        assert_eq!(
            tokens[5]
                .text
                .as_deref(),
            Some("!")
        );
    }

    #[test]
    fn nested_character_span() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p \\w a \\+bd b\\+bd*\\w*", false);

        assert_eq!(
            tokens[1]
                .marker
                .as_deref(),
            Some("w")
        );
        assert_eq!(
            tokens[3]
                .marker
                .as_deref(),
            Some("+bd")
        );
        assert_eq!(
            tokens[3]
                .end_marker
                .as_deref(),
            Some("+bd*")
        );
        assert_eq!(
            tokens[5]
                .marker
                .as_deref(),
            Some("+bd*")
        );
        assert_eq!(
            tokens[6]
                .marker
                .as_deref(),
            Some("w*")
        );
    }

    #[test]
    fn named_attributes_attach_to_opener_and_end() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p \\w gracious|lemma=\"grace\"\\w*", false);

        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Paragraph,
                TokenKind::Character,
                TokenKind::Text,
                TokenKind::End
            ]
        );
        assert_eq!(
            tokens[2]
                .text
                .as_deref(),
            Some("gracious")
        );
        assert_eq!(tokens[1].attributes, vec![Attribute::new("lemma", "grace", 0)]);

        // the end marker inherits the attributes for reporting
        assert_eq!(tokens[3].attributes, tokens[1].attributes);
    }

    #[test]
    fn bare_default_attribute_value() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p \\w foo|grace\\w*", false);

        assert_eq!(
            tokens[2]
                .text
                .as_deref(),
            Some("foo")
        );
        assert_eq!(tokens[1].attributes, vec![Attribute::new("lemma", "grace", 0)]);
    }

    #[test]
    fn unparseable_attributes_stay_text() {
        let mut catalog = catalog();

        // bd declares no attributes, so the bare value has no default
        // to bind to and the | remains literal
        let tokens = tokenize(&mut catalog, "\\p \\bd a|b\\bd*", false);

        assert_eq!(
            tokens[2]
                .text
                .as_deref(),
            Some("a|b")
        );
        assert!(tokens[1]
            .attributes
            .is_empty());
    }

    #[test]
    fn legacy_figure_folds_to_attributes() {
        let mut catalog = catalog();
        let tokens = tokenize(
            &mut catalog,
            "\\p \\fig Desc|art.jpg|col|Here|1995|A caption|1.1\\fig*",
            false,
        );

        let fig = &tokens[1];
        assert_eq!(fig.attribute("alt"), Some("Desc"));
        assert_eq!(fig.attribute("src"), Some("art.jpg"));
        assert_eq!(fig.attribute("size"), Some("col"));
        assert_eq!(fig.attribute("loc"), Some("Here"));
        assert_eq!(fig.attribute("copy"), Some("1995"));
        assert_eq!(fig.attribute("ref"), Some("1.1"));

        // the caption replaces the running text
        assert_eq!(
            tokens[2]
                .text
                .as_deref(),
            Some("A caption")
        );
    }

    #[test]
    fn milestones_with_terminator() {
        let mut catalog = catalog();
        let tokens = tokenize(
            &mut catalog,
            "\\p \\qt-s|who=\"Paul\"\\*words\\qt-e\\*",
            false,
        );

        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Paragraph,
                TokenKind::Milestone,
                TokenKind::Text,
                TokenKind::MilestoneEnd
            ]
        );
        assert_eq!(tokens[1].attribute("who"), Some("Paul"));
        assert_eq!(
            tokens[1]
                .end_marker
                .as_deref(),
            Some("qt-e")
        );
        assert_eq!(
            tokens[2]
                .text
                .as_deref(),
            Some("words")
        );
    }

    #[test]
    fn milestone_with_spaced_terminator() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p \\qt-s \\*done", false);

        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Paragraph, TokenKind::Milestone, TokenKind::Text]
        );
        assert_eq!(
            tokens[2]
                .text
                .as_deref(),
            Some("done")
        );
    }

    #[test]
    fn unterminated_milestone_stays_text() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p \\qt-s|who", false);

        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Paragraph, TokenKind::Text]
        );
        assert_eq!(
            tokens[1]
                .text
                .as_deref(),
            Some("\\qt-s|who")
        );
    }

    #[test]
    fn unknown_marker_synthesized() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p \\zzz hi", false);

        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(
            tokens[1]
                .end_marker
                .as_deref(),
            Some("zzz*")
        );

        // the lookup left an unknown-style descriptor behind
        assert_eq!(
            catalog
                .get("zzz")
                .unwrap()
                .style_type,
            StyleType::Unknown
        );
    }

    #[test]
    fn note_takes_caller() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p \\f + \\ft note\\f*", false);

        assert_eq!(tokens[1].kind, TokenKind::Note);
        assert_eq!(tokens[1].data, vec!["+"]);
        assert_eq!(
            tokens[1]
                .end_marker
                .as_deref(),
            Some("f*")
        );
    }

    #[test]
    fn trailing_space_forced_before_structure() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p\nend of paragraph\n\\p\nmore", false);

        assert_eq!(
            tokens[1]
                .text
                .as_deref(),
            Some("end of paragraph ")
        );
    }

    #[test]
    fn no_space_forced_into_bracketed_verse() {
        let mut catalog = catalog();
        let tokens = tokenize(&mut catalog, "\\p\ntext (\\v 2 more)", false);

        // a verse opening inside a parenthesis keeps the text as is
        assert_eq!(
            tokens[1]
                .text
                .as_deref(),
            Some("text (")
        );
    }

    #[test]
    fn round_trip_is_stable() {
        let mut catalog = catalog();
        let source = "\\id GEN\n\\c 1\n\\p\n\\v 1 Hello \\bd there\\bd* friend\n\\q1 a line\n";

        let tokens = tokenize(&mut catalog, source, false);
        let joined = join_usfm(&tokens);
        let again = tokenize(&mut catalog, &joined, false);

        assert_eq!(tokens, again);

        // and joining is idempotent from there
        assert_eq!(join_usfm(&again), joined);
    }

    #[test]
    fn round_trip_with_attributes() {
        let mut catalog = catalog();
        let source = "\\p \\v 1 \\w gracious|lemma=\"grace\"\\w* words\n";

        let tokens = tokenize(&mut catalog, source, false);
        let joined = join_usfm(&tokens);
        let again = tokenize(&mut catalog, &joined, false);

        assert_eq!(tokens, again);
    }

    #[test]
    fn preserve_mode_keeps_text_exact() {
        let mut catalog = catalog();

        // the marker's terminating space is not consumed, so the text
        // token carries it
        let tokens = tokenize(&mut catalog, "\\p two  spaces\tand tab", true);

        assert_eq!(
            tokens[1]
                .text
                .as_deref(),
            Some(" two  spaces\tand tab")
        );
    }
}
