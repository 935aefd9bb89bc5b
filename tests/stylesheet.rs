#[cfg(test)]
mod verify {
    use markercheck::language::*;
    use markercheck::stylesheet::*;

    fn trim(s: &str) -> &str {
        s.strip_prefix('\n')
            .unwrap_or(s)
    }

    #[test]
    fn basic_marker_definition() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker p
\Name p - Paragraph
\TextType VerseText
\TextProperties paragraph publishable vernacular
\StyleType Paragraph
\FontSize 12
            "#,
        ));

        assert!(sheet
            .errors
            .is_empty());

        let style = sheet
            .catalog
            .get("p")
            .unwrap();
        assert_eq!(style.style_type, StyleType::Paragraph);
        assert_eq!(style.text_type, TextType::VerseText);
        assert!(style
            .properties
            .contains(
                TextProperties::PARAGRAPH
                    | TextProperties::PUBLISHABLE
                    | TextProperties::VERNACULAR
            ));
        assert_eq!(style.font_size, 12);
        assert_eq!(style.end_marker, None);
    }

    #[test]
    fn character_style_end_marker_defaulted() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker bd
\Name bd - Bold
\TextType VerseText
\StyleType Character
            "#,
        ));

        let style = sheet
            .catalog
            .get("bd")
            .unwrap();
        assert_eq!(style.end_marker, Some("bd*".to_owned()));

        // the end marker gets its own entry so the tokenizer can
        // classify it
        let end = sheet
            .catalog
            .get("bd*")
            .unwrap();
        assert_eq!(end.style_type, StyleType::End);
    }

    #[test]
    fn id_marker_is_a_book() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker id
\Name id - Identification
\TextType Other
\StyleType Paragraph
            "#,
        ));

        let style = sheet
            .catalog
            .get("id")
            .unwrap();
        assert!(style
            .properties
            .contains(TextProperties::BOOK));
    }

    #[test]
    fn chapter_and_verse_number_text_types() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker c
\Name c - Chapter Number
\TextType ChapterNumber
\StyleType Paragraph

\Marker v
\Name v - Verse Number
\TextType VerseNumber
\StyleType Character
            "#,
        ));

        assert!(sheet
            .catalog
            .get("c")
            .unwrap()
            .properties
            .contains(TextProperties::CHAPTER));
        assert!(sheet
            .catalog
            .get("v")
            .unwrap()
            .properties
            .contains(TextProperties::VERSE));

        // chapter and verse numbers are not published text
        assert!(!sheet
            .catalog
            .get("v")
            .unwrap()
            .properties
            .contains(TextProperties::PUBLISHABLE));
    }

    #[test]
    fn milestone_end_synthesized() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker qt-s
\Name qt-s - Quotation Start
\TextType Other
\StyleType Milestone
\Endmarker qt-e
\Attributes ?who ?id
            "#,
        ));

        assert!(sheet
            .errors
            .is_empty());

        let end = sheet
            .catalog
            .get("qt-e")
            .unwrap();
        assert_eq!(end.style_type, StyleType::MilestoneEnd);
        assert!(end.has_attribute("id"));
        assert!(!end.attributes[0].required);
    }

    #[test]
    fn milestone_without_end_is_an_error() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker qt-s
\Name qt-s - Quotation Start
\TextType Other
\StyleType Milestone
            "#,
        ));

        assert_eq!(
            sheet.errors,
            vec![SheetError::MissingMilestoneEnd(1, "\\qt-s".to_owned())]
        );
    }

    #[test]
    fn color_decoding() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker wj
\Name wj - Words of Jesus
\TextType VerseText
\StyleType Character
\Color 255

\Marker em
\Name em - Emphasis
\TextType VerseText
\StyleType Character
\Color x00FF00

\Marker no
\Name no - Normal
\TextType VerseText
\StyleType Character
\Color -
            "#,
        ));

        // decimal colors arrive in BGR order
        assert_eq!(
            sheet
                .catalog
                .get("wj")
                .unwrap()
                .color,
            0xFF0000
        );

        // hex colors are already RGB
        assert_eq!(
            sheet
                .catalog
                .get("em")
                .unwrap()
                .color,
            0x00FF00
        );

        assert_eq!(
            sheet
                .catalog
                .get("no")
                .unwrap()
                .color,
            0
        );
    }

    #[test]
    fn margins_stored_in_thousandths() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker q1
\Name q1 - Poetry
\TextType VerseText
\StyleType Paragraph
\LeftMargin .25
\RightMargin 1.5
\FirstLineIndent -
            "#,
        ));

        let style = sheet
            .catalog
            .get("q1")
            .unwrap();
        assert_eq!(style.left_margin, 250);
        assert_eq!(style.right_margin, 1500);
        assert_eq!(style.first_line_indent, 0);
    }

    #[test]
    fn regular_resets_face_styling() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker no
\Name no - Normal
\TextType VerseText
\StyleType Character
\Bold
\Italic
\Regular
            "#,
        ));

        let style = sheet
            .catalog
            .get("no")
            .unwrap();
        assert!(!style.bold);
        assert!(!style.italic);
        assert!(!style.superscript);
        assert!(style.regular);
    }

    #[test]
    fn removal_line_deletes_marker_and_end() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker bd
\Name bd - Bold
\TextType VerseText
\StyleType Character

\Marker p
\Name p - Paragraph
\TextType VerseText
\StyleType Paragraph

\Marker bd -
            "#,
        ));

        // bd and the synthesized bd* are both gone
        assert!(sheet
            .catalog
            .get("bd")
            .is_none());
        assert!(sheet
            .catalog
            .get("bd*")
            .is_none());
        assert_eq!(
            sheet
                .catalog
                .len(),
            1
        );
        assert!(sheet
            .catalog
            .get("p")
            .is_some());
    }

    #[test]
    fn field_errors_carry_line_numbers() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker p
\Name p - Paragraph
\Bogus nothing
\FontSize twelve
\FontSize 12
\StyleType Sideways
\TextType VerseText
\StyleType Paragraph
            "#,
        ));

        assert!(sheet
            .errors
            .contains(&SheetError::UnknownField(3, "bogus".to_owned())));
        assert!(sheet
            .errors
            .contains(&SheetError::InvalidNumber(4, "twelve".to_owned())));
        assert!(sheet
            .errors
            .contains(&SheetError::UnknownStyleType(6, "sideways".to_owned())));

        // the second \FontSize is a duplicate, the second \StyleType too
        assert!(sheet
            .errors
            .contains(&SheetError::DuplicateField(5, "fontsize".to_owned())));
        assert!(sheet
            .errors
            .contains(&SheetError::DuplicateField(8, "styletype".to_owned())));
    }

    #[test]
    fn missing_name_and_duplicate_marker() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker p
\TextType VerseText
\StyleType Paragraph

\Marker p
\Name p - Paragraph
\TextType VerseText
\StyleType Paragraph
            "#,
        ));

        assert!(sheet
            .errors
            .contains(&SheetError::MissingName(1, "\\p".to_owned())));
        assert!(sheet
            .errors
            .contains(&SheetError::DuplicateMarker(5, "\\p".to_owned())));
    }

    #[test]
    fn malformed_attribute_specification() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker fig
\Name fig - Figure
\TextType Other
\StyleType Character
\Attributes ?alt src
            "#,
        ));

        assert!(matches!(
            sheet.errors[0],
            SheetError::InvalidAttributes(5, _)
        ));
    }

    #[test]
    fn stylesheet_without_markers() {
        let sheet = parse_stylesheet("# just a comment\n");
        assert_eq!(sheet.errors, vec![SheetError::NoMarkers]);
        assert!(sheet
            .catalog
            .is_empty());
    }

    #[test]
    fn comments_and_compatibility_prefix() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker p # trailing comment
\Name p - Paragraph
#!\Marker q1
#!\Name q1 - Poetry
\TextType VerseText
\StyleType Paragraph
            "#,
        ));

        // the #! prefix is stripped, so q1 is a real definition
        assert!(sheet
            .catalog
            .get("p")
            .is_some());
        assert!(sheet
            .catalog
            .get("q1")
            .is_some());
    }

    #[test]
    fn default_attribute_rules() {
        let sheet = parse_stylesheet(trim(
            r#"
\Marker w
\Name w - Wordlist
\TextType Other
\StyleType Character
\Attributes ?lemma ?strong

\Marker fig
\Name fig - Figure
\TextType Other
\StyleType Character
\Attributes src size ref ?alt ?loc ?copy
            "#,
        ));

        assert_eq!(
            sheet
                .catalog
                .get("w")
                .unwrap()
                .default_attribute,
            Some("lemma".to_owned())
        );

        // three required attributes leave no room for a bare default
        assert_eq!(
            sheet
                .catalog
                .get("fig")
                .unwrap()
                .default_attribute,
            None
        );
    }
}
