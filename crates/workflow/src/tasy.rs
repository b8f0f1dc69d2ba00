//! Element locators for the Tasy web UI.

use repasse_browser::Selector;

/// Screen that lists third party repasses.
pub const SCREEN_REPASSE_TERCEIROS: &str = "Repasse para Terceiros";

const FILTER_MODAL: &str = r#"//div[@class="filter-modal-content"]"#;
const EMAIL_DIALOG: &str = r#"//div[@class="ngdialog-content" and contains(.,'Email destino')]"#;
const ABORTED_DIALOG: &str =
    r#"//div[@class="ngdialog-content" and contains(.,'Operação abortada')]"#;
const GRID_ACTIVE_ROW: &str =
    r#"//div[@class="datagrid-grid-container"]//div[@class="ui-widget-content slick-row even active"]"#;

/// Quote a string as an XPath literal.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Search field of the main menu.
pub fn menu_search() -> Selector {
    Selector::xpath(r#"//input[@ng-model="search"]"#)
}

/// Menu search result for a screen.
pub fn menu_entry(screen: &str) -> Selector {
    Selector::xpath(format!("//span[text()={}]", xpath_literal(screen)))
}

/// Label that opens the filter modal.
pub fn filter_token() -> Selector {
    Selector::xpath(r#"//div[@class="token-filter-container ng-scope"]/tasy-wlabel"#)
}

pub fn filter_modal() -> Selector {
    Selector::xpath(FILTER_MODAL)
}

/// Third party sequence input of the filter modal.
pub fn third_party_input() -> Selector {
    Selector::xpath(format!(r#"{}//input[@name="NR_SEQ_TERCEIRO"]"#, FILTER_MODAL))
}

/// Description filled in by Tasy once the sequence is recognised.
pub fn third_party_description() -> Selector {
    Selector::xpath(format!(
        r#"{}//tasy-wtextboxlocator[@w-model="record['NR_SEQ_TERCEIRO']"]//input[@ng-model="description"]"#,
        FILTER_MODAL
    ))
}

pub fn filter_button() -> Selector {
    Selector::xpath(format!("{}//button[contains(.,'Filtrar')]", FILTER_MODAL))
}

/// Active grid row of a third party.
pub fn grid_row(seq_terceiro: i64) -> Selector {
    Selector::xpath(format!("{}/div[contains(.,'{}')]", GRID_ACTIVE_ROW, seq_terceiro))
}

/// Panel with the third party's repasses.
pub fn repasse_panel() -> Selector {
    Selector::xpath(r#"//div[@class="wdbpanel-container" and contains(.,'Repasse terceiros')]"#)
}

pub fn repasse_cell(nr_repasse: i64) -> Selector {
    Selector::xpath(format!(
        r#"//div[@class="datagrid-cell-content-wrapper " and contains(.,'{}')]"#,
        nr_repasse
    ))
}

pub fn send_email_button() -> Selector {
    Selector::xpath("//span[contains(.,'Enviar E-mail')]")
}

pub fn email_dialog() -> Selector {
    Selector::xpath(EMAIL_DIALOG)
}

pub fn email_destination() -> Selector {
    Selector::xpath(format!(r#"{}//input[@name="DS_EMAIL_DESTINO"]"#, EMAIL_DIALOG))
}

pub fn email_send_button() -> Selector {
    Selector::xpath(format!("{}//button[contains(.,'Enviar')]", EMAIL_DIALOG))
}

/// Dialog shown when Tasy refuses to send the e-mail.
pub fn aborted_dialog() -> Selector {
    Selector::xpath(ABORTED_DIALOG)
}

pub fn aborted_dialog_text() -> Selector {
    Selector::xpath(format!(r#"{}//div[@class="dialog-content"]"#, ABORTED_DIALOG))
}

pub fn dialog_ok_button() -> Selector {
    Selector::xpath(r#"//div[@class="ngdialog-content"]//button[contains(.,'OK')]"#)
}
