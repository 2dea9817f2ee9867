use aegis_policy::{aggregate, ClassificationLevel, ClassifiedEntity, Compartment};

fn entity(level: ClassificationLevel, markings: &[&str]) -> ClassifiedEntity {
    ClassifiedEntity {
        classification: level,
        portion_markings: markings.iter().map(|s| (*s).to_string()).collect(),
        compartments: [Compartment::Noforn].into_iter().collect(),
    }
}

#[test]
fn banner_reflects_highest_classification_and_sorted_markings() {
    let entities = vec![
        entity(ClassificationLevel::Secret, &["//NOFORN"]),
        entity(ClassificationLevel::TopSecret, &["//HUMINT"]),
        entity(ClassificationLevel::Secret, &["//NOCONTRACT"]),
    ];
    let result = aggregate(&entities, None);
    assert_eq!(result.highest_classification, ClassificationLevel::TopSecret);
    assert_eq!(
        result.all_portion_markings,
        vec!["//HUMINT".to_string(), "//NOCONTRACT".to_string(), "//NOFORN".to_string()]
    );
    assert_eq!(result.computed_from_entity_count, 3);
}

#[test]
fn signature_is_stable_across_entity_orderings() {
    let forward = vec![
        entity(ClassificationLevel::Secret, &["//NOFORN"]),
        entity(ClassificationLevel::TopSecret, &["//HUMINT"]),
        entity(ClassificationLevel::Cui, &["//NOCONTRACT"]),
    ];
    let mut shuffled = forward.clone();
    shuffled.swap(0, 2);

    let a = aggregate(&forward, Some(b"shared-signing-key"));
    let b = aggregate(&shuffled, Some(b"shared-signing-key"));
    assert_eq!(a.signature, b.signature);
    assert_eq!(a.signature_algorithm, "hmac-sha256");
}

#[test]
fn signature_changes_with_a_different_key() {
    let entities = vec![entity(ClassificationLevel::Secret, &["//NOFORN"])];
    let a = aggregate(&entities, Some(b"key-one"));
    let b = aggregate(&entities, Some(b"key-two"));
    assert_ne!(a.signature, b.signature);
}

#[test]
fn empty_entity_list_defaults_to_unclassified_with_stable_signature() {
    let a = aggregate(&[], Some(b"key"));
    let b = aggregate(&[], Some(b"key"));
    assert_eq!(a.highest_classification, ClassificationLevel::Unclassified);
    assert!(a.all_classifications.is_empty());
    assert_eq!(a.signature, b.signature);
}
