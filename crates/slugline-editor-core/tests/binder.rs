//! End-to-end behaviour of the binder against real scenes and documents.

use slugline_common::telemetry;
use slugline_editor_core::script::{Transliteration, font_runs};
use slugline_editor_core::{
    Binder, BinderState, Color, EditorConfig, ElementFormatResolver, ElementType, FormatSet,
    Language, LanguageFonts, Scene, SharedDocument, SharedFormatSet, SharedScene, TextBuffer,
    TextDocument,
};

type Bound = (Binder, SharedScene, SharedDocument, SharedFormatSet);

fn setup(elements: &[(ElementType, &str)]) -> Bound {
    telemetry::init_for_tests();
    let scene = Scene::from_elements(elements.iter().copied()).into_shared();
    let doc = TextDocument::new().into_shared();
    let formats = FormatSet::new().into_shared();
    let mut binder = Binder::new(EditorConfig::default());
    binder.bind(Some(scene.clone()), Some(doc.clone()), Some(formats.clone()));
    (binder, scene, doc, formats)
}

fn texts(doc: &SharedDocument) -> Vec<String> {
    let doc = doc.borrow();
    (0..doc.block_count())
        .map(|i| doc.block_text(i).unwrap())
        .collect()
}

#[test]
fn initialize_round_trips_scene_into_linked_blocks() {
    let (_binder, scene, doc, _) = setup(&[
        (ElementType::Heading, "INT. ROOM"),
        (ElementType::Action, "He walks in."),
    ]);

    assert_eq!(texts(&doc), ["INT. ROOM", "He walks in."]);
    let scene = scene.borrow();
    let doc = doc.borrow();
    for index in 0..2 {
        let linkage = doc.block(index).unwrap().linkage().unwrap();
        assert_eq!(linkage.scene, scene.id());
        assert_eq!(Some(linkage.element), scene.id_at(index));
    }
}

#[test]
fn initialize_twice_is_idempotent() {
    let (mut binder, _scene, doc, _) = setup(&[
        (ElementType::Heading, "INT. ROOM"),
        (ElementType::Character, "ALICE"),
        (ElementType::Dialogue, "Hi."),
    ]);

    let once = doc.borrow().to_string();
    let once_blocks: Vec<_> = doc.borrow().blocks().cloned().collect();
    binder.initialize_document();
    assert_eq!(doc.borrow().to_string(), once);
    let twice_blocks: Vec<_> = doc.borrow().blocks().cloned().collect();
    assert_eq!(twice_blocks.len(), once_blocks.len());
    for (a, b) in once_blocks.iter().zip(&twice_blocks) {
        assert_eq!(a.linkage(), b.linkage());
        assert_eq!(a.block_format(), b.block_format());
        assert_eq!(a.char_runs(), b.char_runs());
    }
}

#[test]
fn every_type_change_applies_the_resolved_format() {
    for from in ElementType::ALL {
        for to in ElementType::ALL {
            if from == to {
                continue;
            }
            let (mut binder, scene, doc, formats) = setup(&[(from, "SOME TEXT")]);
            let id = scene.borrow().id_at(0).unwrap();
            scene.borrow_mut().set_element_type(id, to);
            binder.process_notifications();

            let formats = formats.borrow();
            let resolver = ElementFormatResolver::new(&formats);
            let doc = doc.borrow();
            let block = doc.block(0).unwrap();
            assert_eq!(*block.block_format(), resolver.block_format(to), "{from} -> {to}");
            assert_eq!(*block.char_format(), resolver.char_format(to), "{from} -> {to}");
        }
    }
}

#[test]
fn buffer_edits_reach_only_the_linked_element() {
    let (mut binder, scene, doc, _) = setup(&[
        (ElementType::Action, "first"),
        (ElementType::Action, "second"),
        (ElementType::Action, "third"),
    ]);

    doc.borrow_mut().replace(6..12, "middle");
    binder.process_notifications();

    let scene = scene.borrow();
    let texts: Vec<&str> = scene.elements().map(|e| e.text()).collect();
    assert_eq!(texts, ["first", "middle", "third"]);
}

#[test]
fn orphan_block_is_repaired_with_successor_type() {
    let (mut binder, scene, doc, _) = setup(&[(ElementType::Character, "ALICE")]);

    // An insertion the binder never heard about.
    {
        let mut doc = doc.borrow_mut();
        doc.set_signals_blocked(true);
        doc.insert(5, "\nWhere is everyone?");
        doc.set_signals_blocked(false);
    }
    binder.resynchronize_from_buffer(None);

    let scene = scene.borrow();
    assert_eq!(scene.len(), 2);
    let second = scene.element_at(1).unwrap();
    assert_eq!(second.element_type(), ElementType::Dialogue);
    assert_eq!(second.text(), "Where is everyone?");
    assert_eq!(
        doc.borrow().block(1).unwrap().linkage().unwrap().element,
        second.id()
    );
}

#[test]
fn dead_linkage_is_treated_as_orphan() {
    let (mut binder, scene, doc, _) = setup(&[
        (ElementType::Action, "keep"),
        (ElementType::Action, "gone"),
    ]);
    let gone = scene.borrow().id_at(1).unwrap();
    // Removed without the binder processing the notification.
    scene.borrow_mut().remove_element(gone);
    binder.resynchronize_from_buffer(None);

    let scene = scene.borrow();
    assert_eq!(scene.len(), 2);
    assert_ne!(scene.id_at(1), Some(gone));
    assert_eq!(scene.element_at(1).unwrap().text(), "gone");
    assert_eq!(binder.state(), BinderState::Ready);
}

#[test]
fn mixed_script_runs_break_at_script_boundary_only() {
    let fonts = LanguageFonts::default();
    let text = "The sign read नमस्ते";
    let runs = font_runs(text, 0, "Courier Prime", &fonts, None);

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].range, 0..14);
    assert_eq!(runs[0].family, "Courier Prime");
    assert_eq!(runs[1].range.start, 14);
    assert_eq!(runs[1].range.end, text.chars().count());
    assert_eq!(runs[1].family, fonts.family(Language::Hindi).unwrap());

    let whole = Transliteration {
        range: 0..text.chars().count(),
        language: Language::Tamil,
    };
    let runs = font_runs(text, 0, "Courier Prime", &fonts, Some(&whole));
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].range, whole.range);
    assert_eq!(runs[0].family, fonts.family(Language::Tamil).unwrap());
}

#[test]
fn transliteration_range_is_consumed_by_one_pass() {
    let (mut binder, _scene, doc, formats) = setup(&[(ElementType::Dialogue, "vanakkam")]);
    binder.apply_transliteration(0, 8, Language::Tamil);

    let tamil = formats
        .borrow()
        .language_fonts()
        .family(Language::Tamil)
        .unwrap()
        .to_owned();
    let doc = doc.borrow();
    let block = doc.block(0).unwrap();
    assert!(!block.user_data().has_transliteration());
    assert!(block.char_runs().iter().all(|run| run.format.family == tamil));
}

#[test]
fn background_colors_normalize() {
    let formats = FormatSet::new().into_shared();
    let mut formats = formats.borrow_mut();

    formats.update(ElementType::Action, |f| f.set_background_color(Color::WHITE));
    assert_eq!(
        formats.element_format(ElementType::Action).background_color(),
        Color::TRANSPARENT
    );

    formats.update(ElementType::Action, |f| f.set_background_color(Color::BLACK));
    assert_eq!(
        formats.element_format(ElementType::Action).background_color(),
        Color::TRANSPARENT
    );

    let teal = Color::rgb(0x00, 0x80, 0x80);
    formats.update(ElementType::Action, |f| f.set_background_color(teal));
    let stored = formats.element_format(ElementType::Action).background_color();
    assert_eq!(stored, teal.with_alpha(Color::BACKGROUND_ALPHA));
    assert_eq!(stored.alpha(), 0x40);
}
