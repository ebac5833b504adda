use registro::core::db::initialize_registro_db;
use registro::core::error::RegistroError;
use registro::core::store::Store;
use registro::stores::identity::{Role, register_user};
use registro::stores::inspection::{
    NewInspection, Status, TransitionFields, create_inspection, record_analysis,
    record_failure_details, remove_inspection, transition_inspection,
};
use registro::stores::query::find_inspection_by_document;
use tempfile::tempdir;

fn setup_store() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().unwrap();
    let data_dir = tmp.path().join(".registro").join("data");
    initialize_registro_db(&data_dir).unwrap();
    let store = Store::open(tmp.path()).unwrap();
    register_user(&store, "alice", "Alice Silva", "h1", Role::Producao).unwrap();
    register_user(&store, "bob", "Bob Santos", "h2", Role::Assistencia).unwrap();
    (tmp, store)
}

fn new_doc(documento_id: &str) -> NewInspection {
    NewInspection {
        documento_id: documento_id.to_string(),
        responsavel: "alice".to_string(),
        produto: "controller board".to_string(),
        quantidade: 3,
        ..Default::default()
    }
}

fn owner_fields(username: &str) -> TransitionFields {
    TransitionFields {
        responsavel_assistencia: Some(username.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_document_lifecycle() {
    let (_tmp, store) = setup_store();

    // 1. Create: initial state with creation timestamp, no finalization.
    let record = create_inspection(&store, &new_doc("DOC-1")).unwrap();
    assert_eq!(record.status, Status::Recebido);
    assert_eq!(record.responsavel, "alice");
    assert!(record.data_criacao.ends_with('Z'));
    assert!(record.data_finalizacao.is_none());
    assert!(record.responsavel_assistencia.is_none());

    // 2. Into analysis.
    let record = transition_inspection(
        &store,
        "DOC-1",
        Status::EmAnalise,
        &TransitionFields::default(),
    )
    .unwrap();
    assert_eq!(record.status, Status::EmAnalise);
    assert!(record.data_finalizacao.is_none());

    // 3. Assistance without an owner is refused and changes nothing.
    let err = transition_inspection(
        &store,
        "DOC-1",
        Status::EmAssistencia,
        &TransitionFields::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RegistroError::MissingAssistanceOwner));
    let record = find_inspection_by_document(&store, "DOC-1").unwrap().unwrap();
    assert_eq!(record.status, Status::EmAnalise);
    assert!(record.responsavel_assistencia.is_none());

    // 4. Assistance with an owner.
    let record =
        transition_inspection(&store, "DOC-1", Status::EmAssistencia, &owner_fields("bob"))
            .unwrap();
    assert_eq!(record.status, Status::EmAssistencia);
    assert_eq!(record.responsavel_assistencia.as_deref(), Some("bob"));

    // 5. Finalize: terminal, finalization timestamp set.
    let record = transition_inspection(
        &store,
        "DOC-1",
        Status::Finalizado,
        &TransitionFields::default(),
    )
    .unwrap();
    assert_eq!(record.status, Status::Finalizado);
    let finalized_at = record.data_finalizacao.clone().unwrap();
    assert!(finalized_at.ends_with('Z'));

    // 6. No transitions leave a terminal state.
    let err = transition_inspection(
        &store,
        "DOC-1",
        Status::EmAnalise,
        &TransitionFields::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RegistroError::TerminalStateViolation(_)));

    let err = transition_inspection(
        &store,
        "DOC-1",
        Status::Finalizado,
        &TransitionFields::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RegistroError::AlreadyFinalized(_)));

    // 7. The record is exactly as finalization left it.
    let record = find_inspection_by_document(&store, "DOC-1").unwrap().unwrap();
    assert_eq!(record.status, Status::Finalizado);
    assert_eq!(record.data_finalizacao.as_deref(), Some(finalized_at.as_str()));
}

#[test]
fn test_create_duplicate_document() {
    let (_tmp, store) = setup_store();

    create_inspection(&store, &new_doc("DOC-1")).unwrap();

    let mut second = new_doc("DOC-1");
    second.quantidade = 99;
    second.produto = "relay module".to_string();
    let err = create_inspection(&store, &second).unwrap_err();
    assert!(matches!(err, RegistroError::DuplicateDocument(_)));

    let record = find_inspection_by_document(&store, "DOC-1").unwrap().unwrap();
    assert_eq!(record.quantidade, 3);
    assert_eq!(record.produto, "controller board");
}

#[test]
fn test_create_validation() {
    let (_tmp, store) = setup_store();

    let mut unknown = new_doc("DOC-1");
    unknown.responsavel = "ghost".to_string();
    let err = create_inspection(&store, &unknown).unwrap_err();
    assert!(matches!(err, RegistroError::UnknownResponsible(_)));

    let mut negative = new_doc("DOC-2");
    negative.quantidade = -1;
    let err = create_inspection(&store, &negative).unwrap_err();
    assert!(matches!(err, RegistroError::InvalidQuantity(-1)));

    let mut blank = new_doc("DOC-3");
    blank.produto = "  ".to_string();
    let err = create_inspection(&store, &blank).unwrap_err();
    assert!(matches!(err, RegistroError::ValidationError(_)));

    // Zero quantity is legal.
    let mut zero = new_doc("DOC-4");
    zero.quantidade = 0;
    assert_eq!(create_inspection(&store, &zero).unwrap().quantidade, 0);

    // None of the refused documents exist.
    for doc in ["DOC-1", "DOC-2", "DOC-3"] {
        assert!(find_inspection_by_document(&store, doc).unwrap().is_none());
    }
}

#[test]
fn test_reject_paths() {
    let (_tmp, store) = setup_store();

    // Straight from Recebido.
    create_inspection(&store, &new_doc("DOC-A")).unwrap();
    let record = transition_inspection(
        &store,
        "DOC-A",
        Status::Rejeitado,
        &TransitionFields::default(),
    )
    .unwrap();
    assert_eq!(record.status, Status::Rejeitado);
    assert!(record.data_finalizacao.is_some());

    // From EmAnalise.
    create_inspection(&store, &new_doc("DOC-B")).unwrap();
    transition_inspection(&store, "DOC-B", Status::EmAnalise, &TransitionFields::default())
        .unwrap();
    let record = transition_inspection(
        &store,
        "DOC-B",
        Status::Rejeitado,
        &TransitionFields::default(),
    )
    .unwrap();
    assert_eq!(record.status, Status::Rejeitado);
    assert!(record.data_finalizacao.is_some());

    // Not from EmAssistencia: assistance work ends in Finalizado.
    create_inspection(&store, &new_doc("DOC-C")).unwrap();
    transition_inspection(&store, "DOC-C", Status::EmAssistencia, &owner_fields("bob")).unwrap();
    let err = transition_inspection(
        &store,
        "DOC-C",
        Status::Rejeitado,
        &TransitionFields::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RegistroError::ValidationError(_)));
    let record = find_inspection_by_document(&store, "DOC-C").unwrap().unwrap();
    assert_eq!(record.status, Status::EmAssistencia);
    assert!(record.data_finalizacao.is_none());
}

#[test]
fn test_assistance_directly_from_recebido() {
    let (_tmp, store) = setup_store();

    create_inspection(&store, &new_doc("DOC-1")).unwrap();
    let record =
        transition_inspection(&store, "DOC-1", Status::EmAssistencia, &owner_fields("bob"))
            .unwrap();
    assert_eq!(record.status, Status::EmAssistencia);
    assert_eq!(record.responsavel_assistencia.as_deref(), Some("bob"));

    // And straight to Finalizado from there.
    let record = transition_inspection(
        &store,
        "DOC-1",
        Status::Finalizado,
        &TransitionFields::default(),
    )
    .unwrap();
    assert_eq!(record.status, Status::Finalizado);
}

#[test]
fn test_finalize_requires_analysis_or_assistance() {
    let (_tmp, store) = setup_store();

    create_inspection(&store, &new_doc("DOC-1")).unwrap();
    let err = transition_inspection(
        &store,
        "DOC-1",
        Status::Finalizado,
        &TransitionFields::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RegistroError::ValidationError(_)));

    let record = find_inspection_by_document(&store, "DOC-1").unwrap().unwrap();
    assert_eq!(record.status, Status::Recebido);
    assert!(record.data_finalizacao.is_none());
}

#[test]
fn test_failed_transition_is_atomic() {
    let (_tmp, store) = setup_store();

    let mut doc = new_doc("DOC-1");
    doc.observacao = Some("original note".to_string());
    create_inspection(&store, &doc).unwrap();

    // Illegal target carrying field updates: nothing may stick.
    let fields = TransitionFields {
        observacao: Some("should not appear".to_string()),
        quantidade: Some(42),
        ..Default::default()
    };
    let err = transition_inspection(&store, "DOC-1", Status::Finalizado, &fields).unwrap_err();
    assert!(matches!(err, RegistroError::ValidationError(_)));

    let record = find_inspection_by_document(&store, "DOC-1").unwrap().unwrap();
    assert_eq!(record.status, Status::Recebido);
    assert_eq!(record.observacao.as_deref(), Some("original note"));
    assert_eq!(record.quantidade, 3);
}

#[test]
fn test_transition_field_updates_apply_with_status() {
    let (_tmp, store) = setup_store();

    create_inspection(&store, &new_doc("DOC-1")).unwrap();
    let fields = TransitionFields {
        falha: Some("cold solder joint".to_string()),
        localizacao_componente: Some("U7".to_string()),
        lado_placa: Some("top".to_string()),
        setor: Some("SMT".to_string()),
        quantidade: Some(2),
        ..Default::default()
    };
    let record = transition_inspection(&store, "DOC-1", Status::EmAnalise, &fields).unwrap();
    assert_eq!(record.status, Status::EmAnalise);
    assert_eq!(record.falha.as_deref(), Some("cold solder joint"));
    assert_eq!(record.localizacao_componente.as_deref(), Some("U7"));
    assert_eq!(record.quantidade, 2);

    // Negative quantity refused before anything is touched.
    let bad = TransitionFields {
        quantidade: Some(-5),
        ..Default::default()
    };
    let err =
        transition_inspection(&store, "DOC-1", Status::EmAssistencia, &bad).unwrap_err();
    assert!(matches!(err, RegistroError::InvalidQuantity(-5)));
    let record = find_inspection_by_document(&store, "DOC-1").unwrap().unwrap();
    assert_eq!(record.quantidade, 2);
    assert_eq!(record.status, Status::EmAnalise);
}

#[test]
fn test_owner_field_only_for_assistance() {
    let (_tmp, store) = setup_store();

    create_inspection(&store, &new_doc("DOC-1")).unwrap();
    let err =
        transition_inspection(&store, "DOC-1", Status::EmAnalise, &owner_fields("bob"))
            .unwrap_err();
    assert!(matches!(err, RegistroError::ValidationError(_)));

    // Unknown assistance owner is a directory failure, not a silent write.
    let err =
        transition_inspection(&store, "DOC-1", Status::EmAssistencia, &owner_fields("ghost"))
            .unwrap_err();
    assert!(matches!(err, RegistroError::UnknownResponsible(_)));
    let record = find_inspection_by_document(&store, "DOC-1").unwrap().unwrap();
    assert_eq!(record.status, Status::Recebido);
}

#[test]
fn test_transition_unknown_document() {
    let (_tmp, store) = setup_store();
    let err = transition_inspection(
        &store,
        "NO-SUCH-DOC",
        Status::EmAnalise,
        &TransitionFields::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RegistroError::NotFound(_)));
}

#[test]
fn test_failure_details_replace_payload() {
    let (_tmp, store) = setup_store();

    create_inspection(&store, &new_doc("DOC-1")).unwrap();

    let first = serde_json::json!([{ "tipo": "solda", "componente": "U7" }]);
    let record = record_failure_details(&store, "DOC-1", &first).unwrap();
    assert_eq!(record.falhas_json, Some(first));

    // Second write replaces, never merges.
    let second = serde_json::json!({ "itens": [], "revisao": 2 });
    let record = record_failure_details(&store, "DOC-1", &second).unwrap();
    assert_eq!(record.falhas_json, Some(second.clone()));

    // Terminal records are read-only for failure payloads.
    transition_inspection(&store, "DOC-1", Status::Rejeitado, &TransitionFields::default())
        .unwrap();
    let err = record_failure_details(&store, "DOC-1", &serde_json::json!([])).unwrap_err();
    assert!(matches!(err, RegistroError::TerminalStateViolation(_)));
    let record = find_inspection_by_document(&store, "DOC-1").unwrap().unwrap();
    assert_eq!(record.falhas_json, Some(second));
}

#[test]
fn test_failure_details_unknown_document() {
    let (_tmp, store) = setup_store();
    let err =
        record_failure_details(&store, "NO-SUCH-DOC", &serde_json::json!([])).unwrap_err();
    assert!(matches!(err, RegistroError::NotFound(_)));
}

#[test]
fn test_analysis_result_any_state() {
    let (_tmp, store) = setup_store();

    create_inspection(&store, &new_doc("DOC-1")).unwrap();
    let record = record_analysis(&store, "DOC-1", "possible cold joint near U7").unwrap();
    assert_eq!(
        record.resultado_ia.as_deref(),
        Some("possible cold joint near U7")
    );

    // Still writable after finalization: analysis output is advisory
    // metadata, not lifecycle state.
    transition_inspection(&store, "DOC-1", Status::EmAnalise, &TransitionFields::default())
        .unwrap();
    transition_inspection(&store, "DOC-1", Status::Finalizado, &TransitionFields::default())
        .unwrap();
    let record = record_analysis(&store, "DOC-1", "post-closure re-run").unwrap();
    assert_eq!(record.resultado_ia.as_deref(), Some("post-closure re-run"));
    assert_eq!(record.status, Status::Finalizado);
}

#[test]
fn test_remove_is_always_refused() {
    let (_tmp, store) = setup_store();

    create_inspection(&store, &new_doc("DOC-1")).unwrap();
    let err = remove_inspection(&store, "DOC-1").unwrap_err();
    assert!(matches!(err, RegistroError::UnsupportedOperation(_)));
    assert!(find_inspection_by_document(&store, "DOC-1").unwrap().is_some());
}

#[test]
fn test_finalization_timestamp_shape() {
    let (_tmp, store) = setup_store();

    create_inspection(&store, &new_doc("DOC-1")).unwrap();
    transition_inspection(&store, "DOC-1", Status::EmAnalise, &TransitionFields::default())
        .unwrap();
    let record = transition_inspection(
        &store,
        "DOC-1",
        Status::Finalizado,
        &TransitionFields::default(),
    )
    .unwrap();

    let ts_shape = regex::Regex::new(r"^\d+Z$").unwrap();
    assert!(ts_shape.is_match(&record.data_criacao));
    assert!(ts_shape.is_match(record.data_finalizacao.as_deref().unwrap()));
}
