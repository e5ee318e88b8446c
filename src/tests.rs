//! Flow tests over the SQLite collaborators.
//! They use an in-memory database unless a test needs to reopen a file.

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::models::{
        FileKind, InvoiceState, ItemFilter, ItemStatus, ItemType, LogSource, MissingField, NewItem, Settings, TrafficLight,
    };
    use crate::services::state::{load_settings, AppState};

    const MEIER_ORDER: &str = "Typ: Auftrag
Datum: 23.01.25
Kunde: Herr Meier
Adresse: Hauptstr. 1, 35390 Gießen
AP: Frau Meier
Rechnungsadresse: Hauptstr. 1, 35390 Gießen";

    const BASF_PROJECT: &str = "Typ: Projekt
Datum: 01.03.2025
Kunde: BASF Industrie GmbH
Adresse: Werkstr. 2, 67056 Ludwigshafen";

    fn settings(persist: bool) -> Settings {
        Settings {
            persist_invoice_state: persist,
            latest_limit: 20,
        }
    }

    fn setup_state() -> AppState {
        let db = Database::open_in_memory().expect("Failed to create in-memory database");
        AppState::new(db, settings(true))
    }

    // ===== IMPORT =====

    #[test]
    fn test_import_complete_message() {
        let state = setup_state();
        let result = state.import_message(MEIER_ORDER).unwrap();

        assert_eq!(result.code, "A-MEIER-230125");
        assert!(result.missing.is_empty());
        assert!(result.id.starts_with("A-"));

        let view = state.item_view(&result.id).unwrap();
        assert_eq!(view.item.customer_name, "Herr Meier");
        assert_eq!(view.item.order_date, "2025-01-23");
        assert_eq!(view.item.billing_address.as_deref(), Some("Hauptstr. 1, 35390 Gießen"));
        assert_eq!(
            view.item.status,
            ItemStatus {
                data_complete: true,
                report_generated: false,
                invoice_written: false,
            }
        );
    }

    #[test]
    fn test_import_keeps_message_as_log() {
        let state = setup_state();
        let result = state.import_message(MEIER_ORDER).unwrap();

        let logs = state.logs(&result.id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].source, LogSource::Whatsapp);
        assert!(logs[0].text.starts_with("Typ: Auftrag"));
    }

    #[test]
    fn test_import_incomplete_message_still_creates_item() {
        let state = setup_state();
        let result = state.import_message("Kunde: Schulz Bau GmbH\nDatum: 2025-05-02").unwrap();

        assert_eq!(
            result.missing,
            vec![
                MissingField::Type,
                MissingField::Address,
                MissingField::ContactName,
                MissingField::BillingAddress,
            ]
        );
        let view = state.item_view(&result.id).unwrap();
        assert_eq!(view.item.code, "A-SCHULZ-020525");
        assert_eq!(view.item.address, "—");
        assert_eq!(view.item.contact_name, None);
        assert!(!view.item.status.data_complete);
    }

    #[test]
    fn test_import_rejects_empty_text() {
        let state = setup_state();
        assert!(state.import_message("   \n ").is_err());
    }

    // ===== MANUAL CREATION =====

    fn new_order(customer: &str, date: &str) -> NewItem {
        NewItem {
            item_type: ItemType::Order,
            customer_name: customer.to_string(),
            address: "Hauptstr. 1".to_string(),
            order_date: date.to_string(),
            contact_name: None,
            billing_address: None,
            code: None,
        }
    }

    #[test]
    fn test_create_item_from_fields_generates_code() {
        let state = setup_state();
        let item = state.create_item(&new_order("Herr Meier", "23.01.25")).unwrap();
        assert_eq!(item.code, "A-MEIER-230125");
        assert_eq!(item.order_date, "2025-01-23");
        assert!(item.status.data_complete);
        assert!(item.id.starts_with("A-"));

        let second = state.create_item(&new_order("Meier", "2025-01-23")).unwrap();
        assert_eq!(second.code, "A-MEIER-230125-02");
    }

    #[test]
    fn test_explicit_code_is_used_verbatim() {
        let state = setup_state();
        let mut fields = new_order("Herr Meier", "2025-01-23");
        fields.code = Some("  SONDER-1  ".to_string());
        assert_eq!(state.create_item(&fields).unwrap().code, "SONDER-1");

        fields.code = Some("   ".to_string());
        assert_eq!(state.create_item(&fields).unwrap().code, "A-MEIER-230125");
    }

    #[test]
    fn test_incomplete_fields_leave_item_red() {
        let state = setup_state();
        let mut fields = new_order("", "");
        fields.item_type = ItemType::Project;
        fields.contact_name = Some(" ".to_string());
        let item = state.create_item(&fields).unwrap();

        assert_eq!(item.customer_name, "");
        assert_eq!(item.contact_name, None);
        assert!(!item.status.data_complete);
        assert!(item.code.starts_with("P-UNBEKANNT-"));

        let view = state.item_view(&item.id).unwrap();
        assert_eq!(view.status.traffic_light, TrafficLight::Red);
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let state = setup_state();
        assert!(state.create_item(&new_order("Meier", "morgen")).is_err());
        assert!(state.list_views(false, &ItemFilter::default()).unwrap().is_empty());
    }

    // ===== CODES =====

    #[test]
    fn test_siblings_get_stable_suffixes() {
        let state = setup_state();
        let first = state.import_message(MEIER_ORDER).unwrap();
        let second = state
            .import_message("Typ: Auftrag\nDatum: 23.1.2025\nKunde: Meier")
            .unwrap();
        let third = state
            .import_message("Typ: Auftrag\nDatum: 2025-01-23\nKunde: Frau Meier")
            .unwrap();

        assert_eq!(first.code, "A-MEIER-230125");
        assert_eq!(second.code, "A-MEIER-230125-02");
        assert_eq!(third.code, "A-MEIER-230125-03");

        assert_eq!(state.item_view(&first.id).unwrap().display_code, "A-MEIER-230125-01");
        assert_eq!(state.item_view(&second.id).unwrap().display_code, "A-MEIER-230125-02");

        let views = state.list_views(false, &ItemFilter::default()).unwrap();
        let mut codes: Vec<String> = views.iter().map(|v| v.display_code.clone()).collect();
        codes.sort();
        assert_eq!(
            codes,
            vec!["A-MEIER-230125-01", "A-MEIER-230125-02", "A-MEIER-230125-03"]
        );
    }

    #[test]
    fn test_order_and_project_do_not_share_stems() {
        let state = setup_state();
        let order = state.import_message("Typ: Auftrag\nDatum: 01.03.25\nKunde: BASF Industrie GmbH").unwrap();
        let project = state.import_message(BASF_PROJECT).unwrap();

        assert_eq!(order.code, "A-BASF-010325");
        assert_eq!(project.code, "P-BASF-010325");
        assert_eq!(state.item_view(&project.id).unwrap().display_code, "P-BASF-010325");
    }

    #[test]
    fn test_items_with_stem_ignores_longer_codes() {
        let state = setup_state();
        let id = state.import_message(MEIER_ORDER).unwrap().id;

        let db = state.db.lock().unwrap();
        let mut legacy = db.get_item(&id).unwrap().unwrap();
        legacy.id = "A-legacy".to_string();
        legacy.code = "A-MEIER-230125-NACHTRAG".to_string();
        db.insert_item(&legacy).unwrap();

        let siblings = db.items_with_stem("A-MEIER-230125").unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0].id, id);
    }

    // ===== STATUS =====

    #[test]
    fn test_order_status_follows_files_and_invoice() {
        let state = setup_state();
        let id = state.import_message(MEIER_ORDER).unwrap().id;

        let view = state.item_view(&id).unwrap();
        assert_eq!(view.status.traffic_light, TrafficLight::Red);
        assert_eq!(view.status.text, "Basisdaten fehlen · Rechnung fehlt");

        state.add_file(&id, FileKind::Ticket, Some("auftrag.pdf"), 1024).unwrap();
        let view = state.item_view(&id).unwrap();
        assert_eq!(view.status.traffic_light, TrafficLight::Yellow);
        assert_eq!(view.status.text, "Basisdaten vollständig · Rechnung fehlt");

        assert_eq!(state.cycle_invoice(&id).unwrap(), InvoiceState::Invoice);
        let view = state.item_view(&id).unwrap();
        assert_eq!(view.status.traffic_light, TrafficLight::Green);
        assert_eq!(view.invoice_state, InvoiceState::Invoice);
    }

    #[test]
    fn test_stored_flags_stay_behind_live_status() {
        let state = setup_state();
        let id = state.import_message(BASF_PROJECT).unwrap().id;
        state.add_file(&id, FileKind::Report, Some("bericht.pdf"), 0).unwrap();
        state.set_invoice(&id, InvoiceState::Paid).unwrap();

        let view = state.item_view(&id).unwrap();
        assert_eq!(view.status.traffic_light, TrafficLight::Green);
        // written once at creation, never reconciled
        assert!(!view.item.status.report_generated);
        assert!(!view.item.status.invoice_written);
        assert!(!view.item.status.data_complete);
    }

    #[test]
    fn test_project_without_report_is_yellow() {
        let state = setup_state();
        let id = state.import_message(BASF_PROJECT).unwrap().id;
        state.set_invoice(&id, InvoiceState::Paid).unwrap();

        let view = state.item_view(&id).unwrap();
        assert_eq!(view.status.traffic_light, TrafficLight::Yellow);
        assert_eq!(
            view.status.text,
            "Basisdaten vollständig · Bericht fehlt · Rechnung geschrieben"
        );
    }

    #[test]
    fn test_day_overview_counts_lights() {
        let state = setup_state();
        let meier = state.import_message(MEIER_ORDER).unwrap().id;
        state.import_message("Typ: Projekt\nDatum: 23.01.25\nKunde: Stadtwerke Gießen GmbH\nAdresse: Ring 1").unwrap();
        state.import_message(BASF_PROJECT).unwrap();
        state.add_file(&meier, FileKind::Ticket, None, 0).unwrap();

        let overview = state.day_overview("2025-01-23").unwrap();
        assert_eq!(overview.items.len(), 2);
        assert_eq!((overview.red, overview.yellow, overview.green), (0, 2, 0));
    }

    // ===== FILES & LOGS =====

    #[test]
    fn test_add_file_defaults() {
        let state = setup_state();
        let id = state.import_message(MEIER_ORDER).unwrap().id;

        let file = state.add_file(&id, FileKind::Picture, None, -5).unwrap();
        assert!(file.id.starts_with("F-"));
        assert_eq!(file.filename, format!("{}.dat", file.id));
        assert_eq!(file.url, format!("/files/{}-{}", file.id, file.filename));
        assert_eq!(file.size_bytes, 0);
    }

    #[test]
    fn test_add_file_to_unknown_item_fails() {
        let state = setup_state();
        let err = state.add_file("A-missing", FileKind::Ticket, None, 0).unwrap_err();
        assert!(err.to_string().contains("Item not found"));
    }

    #[test]
    fn test_manual_log_is_trimmed() {
        let state = setup_state();
        let id = state.import_message(MEIER_ORDER).unwrap().id;

        let entry = state.add_log(&id, "  Schlüssel beim Hausmeister  ").unwrap();
        assert_eq!(entry.text, "Schlüssel beim Hausmeister");
        assert_eq!(entry.source, LogSource::Manual);
        assert!(state.add_log(&id, "   ").is_err());
        assert_eq!(state.logs(&id).unwrap().len(), 2);
    }

    // ===== INVOICE STATE =====

    #[test]
    fn test_invoice_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("werkbuch.sqlite");

        let id = {
            let state = AppState::new(Database::new(path.clone()).unwrap(), settings(true));
            let id = state.import_message(MEIER_ORDER).unwrap().id;
            state.cycle_invoice(&id).unwrap();
            state.cycle_invoice(&id).unwrap();
            id
        };

        let state = AppState::new(Database::new(path).unwrap(), settings(true));
        assert_eq!(state.item_view(&id).unwrap().invoice_state, InvoiceState::Paid);
    }

    #[test]
    fn test_memory_invoice_state_is_lost_on_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("werkbuch.sqlite");

        let id = {
            let state = AppState::new(Database::new(path.clone()).unwrap(), settings(false));
            let id = state.import_message(MEIER_ORDER).unwrap().id;
            assert_eq!(state.cycle_invoice(&id).unwrap(), InvoiceState::Invoice);
            assert_eq!(state.item_view(&id).unwrap().invoice_state, InvoiceState::Invoice);
            id
        };

        let state = AppState::new(Database::new(path).unwrap(), settings(false));
        assert_eq!(state.item_view(&id).unwrap().invoice_state, InvoiceState::None);
    }

    #[test]
    fn test_written_invoice_flag_defaults_to_paid() {
        let state = setup_state();
        let id = state.import_message(MEIER_ORDER).unwrap().id;
        let id = {
            let db = state.db.lock().unwrap();
            let mut written = db.get_item(&id).unwrap().unwrap();
            written.id = "A-written".to_string();
            written.status = ItemStatus {
                data_complete: true,
                report_generated: false,
                invoice_written: true,
            };
            db.insert_item(&written).unwrap();
            written.id
        };

        let item = state.item_view(&id).unwrap().item;
        assert_eq!(state.invoice_state(&item), InvoiceState::Paid);
        assert_eq!(state.invoice_state(&item), InvoiceState::Paid);
    }

    #[test]
    fn test_unknown_item_cannot_be_toggled() {
        let state = setup_state();
        assert!(state.cycle_invoice("P-nothing").is_err());
    }

    // ===== SETTINGS & STORAGE =====

    #[test]
    fn test_settings_defaults_and_overrides() {
        let db = Database::open_in_memory().unwrap();
        let defaults = load_settings(&db);
        assert!(defaults.persist_invoice_state);
        assert_eq!(defaults.latest_limit, 20);

        db.set_setting("persist_invoice_state", "false").unwrap();
        db.set_setting("latest_limit", "5").unwrap();
        let loaded = load_settings(&db);
        assert!(!loaded.persist_invoice_state);
        assert_eq!(loaded.latest_limit, 5);

        db.set_setting("latest_limit", "viele").unwrap();
        assert_eq!(load_settings(&db).latest_limit, 20);
    }

    #[test]
    fn test_latest_items_respects_limit() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("latest_limit", "2").unwrap();
        let settings = load_settings(&db);
        let state = AppState::new(db, settings);

        for name in ["Meier", "Schulz", "Becker"] {
            state
                .import_message(&format!("Typ: Auftrag\nDatum: 23.01.25\nKunde: {}", name))
                .unwrap();
        }
        assert_eq!(state.list_views(true, &ItemFilter::default()).unwrap().len(), 2);
        assert_eq!(state.list_views(false, &ItemFilter::default()).unwrap().len(), 3);
    }

    #[test]
    fn test_list_filters_by_type_and_query() {
        let state = setup_state();
        let meier = state.import_message(MEIER_ORDER).unwrap().id;
        let basf = state.import_message(BASF_PROJECT).unwrap().id;
        state
            .import_message("Typ: Auftrag\nDatum: 02.05.25\nKunde: Schulz\nAdresse: Ring 1\nAP: Herr Braun")
            .unwrap();

        let ids = |filter: ItemFilter| -> Vec<String> {
            state
                .list_views(false, &filter)
                .unwrap()
                .into_iter()
                .map(|view| view.item.id)
                .collect()
        };

        let projects = ids(ItemFilter {
            item_type: Some(ItemType::Project),
            query: None,
        });
        assert_eq!(projects, vec![basf.clone()]);

        let by_city = ids(ItemFilter {
            item_type: None,
            query: Some("GIEßEN".to_string()),
        });
        assert_eq!(by_city, vec![meier.clone()]);

        let by_code = ids(ItemFilter {
            item_type: Some(ItemType::Order),
            query: Some("a-meier".to_string()),
        });
        assert_eq!(by_code, vec![meier]);

        let by_contact = ids(ItemFilter {
            item_type: None,
            query: Some("braun".to_string()),
        });
        assert_eq!(by_contact.len(), 1);

        let by_date = ids(ItemFilter {
            item_type: None,
            query: Some("2025-03".to_string()),
        });
        assert_eq!(by_date, vec![basf]);

        let blank = ids(ItemFilter {
            item_type: None,
            query: Some("  ".to_string()),
        });
        assert_eq!(blank.len(), 3);
    }

    #[test]
    fn test_failed_transaction_leaves_nothing_behind() {
        let state = setup_state();
        let id = state.import_message(MEIER_ORDER).unwrap().id;
        let db = state.db.lock().unwrap();
        let mut copy = db.get_item(&id).unwrap().unwrap();
        copy.id = "A-copy".to_string();

        let result: anyhow::Result<()> = db.in_transaction(|db| {
            db.insert_item(&copy)?;
            anyhow::bail!("log insert failed")
        });

        assert!(result.is_err());
        assert!(db.get_item("A-copy").unwrap().is_none());
        assert_eq!(db.list_items().unwrap().len(), 1);
    }

    #[test]
    fn test_files_are_listed_per_item() {
        let state = setup_state();
        let id = state.import_message(MEIER_ORDER).unwrap().id;
        let other = state.import_message(BASF_PROJECT).unwrap().id;
        let db = state.db.lock().unwrap();
        let file = crate::models::ItemFile {
            id: "F-1".to_string(),
            item_id: id.clone(),
            kind: FileKind::Other,
            filename: "x".to_string(),
            url: "/files/x".to_string(),
            size_bytes: 0,
            created_at: "2025-01-23T10:00:00+00:00".to_string(),
        };
        db.insert_file(&file).unwrap();
        assert_eq!(db.files_of_item(&id).unwrap(), vec![file]);
        assert!(db.files_of_item(&other).unwrap().is_empty());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("werkbuch.sqlite");
        Database::new(path.clone()).unwrap();
        let db = Database::new(path).unwrap();
        assert!(db.list_items().unwrap().is_empty());
    }
}
