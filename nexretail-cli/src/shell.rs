use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use inquire::validator::Validation;
use inquire::{CustomType, InquireError, Select, Text};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use nexretail_core::ai::responses::{flagged, forecast_for};
use nexretail_core::summary::format_amount;
use nexretail_core::transfer::{self, INVENTORY_EXPORT_FILE, LEDGER_EXPORT_FILE};
use nexretail_core::{
    dictation_number, dictation_text, summarize, Activation, AiAnomalyResult, AiForecastResult,
    AssistantDispatcher, AssistantFeature, AssistantReply, AssistantRequest, Completion, Config,
    DispatcherSettings, Product, ProductCategory, ProductPatch, ReasoningService, RecordStore,
    SpeechAction, SpeechController, SpeechError, StoreEvent, SubscriptionId, Transaction,
    TransactionPatch, TransactionStatus, TransactionType, View, VoiceSettings,
};

use crate::terminal_speech::TerminalSpeech;

const MAIN_MENU: [&str; 7] = [
    "Dashboard",
    "Inventory",
    "Financials",
    "Sales",
    "Assistant",
    "Save config",
    "Quit",
];

const INVENTORY_MENU: [&str; 8] = [
    "List products",
    "Add product",
    "Edit product",
    "Delete product",
    "AI demand forecast",
    "Import CSV",
    "Export CSV",
    "Back",
];

const FINANCIALS_MENU: [&str; 8] = [
    "List ledger",
    "Add transaction",
    "Edit transaction",
    "Delete transaction",
    "AI anomaly audit",
    "Import CSV",
    "Export CSV",
    "Back",
];

const SALES_MENU: [&str; 5] = [
    "Sales history",
    "Quick POS sale",
    "Edit sale",
    "Delete sale",
    "Back",
];

/// Interactive terminal front end; each menu plays the role of one view
pub struct Shell {
    config: Config,
    config_path: PathBuf,
    store: RecordStore,
    dispatcher: AssistantDispatcher,
    speech: SpeechController<TerminalSpeech>,
    voice_input: bool,
    ai_mode: String,
    view: View,
    changes: Rc<RefCell<Vec<StoreEvent>>>,
    subscription: SubscriptionId,
    last_answer: Option<String>,
    forecasts: Vec<AiForecastResult>,
}

impl Shell {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        mut store: RecordStore,
        service: Arc<dyn ReasoningService>,
        ai_mode: String,
        voice_input: bool,
    ) -> Self {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        let subscription = store.subscribe(move |event: &StoreEvent| {
            sink.borrow_mut().push(event.clone());
        });

        let dispatcher = AssistantDispatcher::new(service, DispatcherSettings::from(&config));
        let speech = SpeechController::new(
            TerminalSpeech::new(voice_input),
            VoiceSettings::from(&config),
        );

        Self {
            config,
            config_path,
            store,
            dispatcher,
            speech,
            voice_input,
            ai_mode,
            view: View::Dashboard,
            changes,
            subscription,
            last_answer: None,
            forecasts: Vec::new(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        println!("{}", "NexRetail ERP".bold().cyan());
        println!(
            "Assistant: {} | Locale: {} | Voice input: {}",
            self.ai_mode,
            self.config.locale,
            if self.voice_input { "on" } else { "off" }
        );
        self.show_dashboard();

        loop {
            self.deliver_ready()?;
            let choice = match Select::new("Go to:", MAIN_MENU.to_vec()).prompt() {
                Ok(choice) => choice,
                Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
                    break
                }
                Err(e) => return Err(e.into()),
            };

            let outcome = match choice {
                "Dashboard" => {
                    self.show_dashboard();
                    Ok(())
                }
                "Inventory" => self.inventory(),
                "Financials" => self.financials(),
                "Sales" => self.sales(),
                "Assistant" => self.assistant(),
                "Save config" => self.save_config(),
                _ => break,
            };
            self.handle_outcome(outcome)?;
        }

        self.speech.stop_speaking();
        self.store.unsubscribe(self.subscription);
        Ok(())
    }

    /// Print what changed and keep going unless the terminal itself failed
    fn handle_outcome(&mut self, outcome: Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => {}
            Err(e) if is_cancel(&e) => println!("{}", "Cancelled.".yellow()),
            Err(e) if e.downcast_ref::<InquireError>().is_some() => return Err(e),
            Err(e) => println!("{} {:#}", "Error:".red(), e),
        }
        self.report_changes();
        Ok(())
    }

    fn report_changes(&mut self) {
        let events: Vec<StoreEvent> = self.changes.borrow_mut().drain(..).collect();
        for event in events {
            let line = match &event {
                StoreEvent::Created { kind, id } => format!("{} {} added", kind, id),
                StoreEvent::Updated { kind, id } => format!("{} {} updated", kind, id),
                StoreEvent::Deleted { kind, id } => format!("{} {} deleted", kind, id),
                StoreEvent::Imported { kind, count } => {
                    format!("{} {} record(s) imported", count, kind.to_string().to_lowercase())
                }
            };
            println!("{} {}", "✓".green(), line);
        }
    }

    /// Hand over assistant results that finished while the user was elsewhere
    fn deliver_ready(&mut self) -> Result<()> {
        for completion in self.dispatcher.poll() {
            self.deliver(completion)?;
        }
        Ok(())
    }

    fn deliver(&mut self, completion: Completion) -> Result<()> {
        match completion.reply {
            AssistantReply::Chat(answer) => {
                println!("{} {}", "NexAI:".bold().cyan(), answer);
                self.speech.speak(&answer)?;
                self.last_answer = Some(answer);
            }
            AssistantReply::Forecast(results) => {
                if results.is_empty() {
                    println!("{}", "No forecast available right now.".yellow());
                } else {
                    println!("{}", "Demand forecast ready.".cyan());
                }
                self.forecasts = results;
            }
            AssistantReply::Audit(results) => print_anomalies(&results),
        }
        Ok(())
    }

    /// Wait for the feature's result, leaving it to a later poll on timeout
    fn await_reply(&mut self, feature: AssistantFeature) -> Result<bool> {
        match self.dispatcher.wait_for(feature, self.config.request_timeout()) {
            Some(completion) => {
                self.deliver(completion)?;
                Ok(true)
            }
            None => {
                if self.dispatcher.is_pending(feature) {
                    println!(
                        "{}",
                        "Still working; the result will show up when it arrives.".yellow()
                    );
                }
                Ok(false)
            }
        }
    }

    // ---- Dashboard ----

    fn show_dashboard(&mut self) {
        self.view = View::Dashboard;
        let digest = summarize(&self.store, self.view, &self.config.summary_options());

        println!();
        println!("{}", "Dashboard".bold());
        println!("{}", "-".repeat(60));
        println!(
            "  Total revenue:    Rp {}",
            format_amount(digest.total_revenue).green()
        );
        println!("  Products:         {}", self.store.products().len());
        let low = digest.low_stock_count.to_string();
        println!(
            "  Low stock:        {}",
            if digest.low_stock_count > 0 {
                low.red()
            } else {
                low.green()
            }
        );
        println!("  Ledger entries:   {}", self.store.transactions().len());

        let low_stock: Vec<&Product> = self
            .store
            .products()
            .iter()
            .filter(|p| p.is_low_stock())
            .collect();
        if !low_stock.is_empty() {
            println!();
            println!("{}", "Needs restocking:".yellow());
            for product in low_stock {
                println!(
                    "  {} ({} left, reorder at {})",
                    product.name, product.stock_level, product.reorder_point
                );
            }
        }

        println!();
        println!("{}", "Latest transactions:".bold());
        if digest.recent_transactions.is_empty() {
            println!("  {}", "none".dimmed());
        }
        for line in &digest.recent_transactions {
            println!(
                "  {:<9} Rp {:>14}  {}",
                line.tx_type,
                format_amount(line.amount),
                line.description
            );
        }
        println!();
    }

    // ---- Inventory ----

    fn inventory(&mut self) -> Result<()> {
        self.view = View::Inventory;
        self.list_products();

        loop {
            self.deliver_ready()?;
            let Some(action) =
                optional(Select::new("Inventory:", INVENTORY_MENU.to_vec()).prompt())?
            else {
                return Ok(());
            };

            let outcome = match action {
                "List products" => {
                    self.list_products();
                    Ok(())
                }
                "Add product" => self.add_product(),
                "Edit product" => self.edit_product(),
                "Delete product" => self.delete_product(),
                "AI demand forecast" => self.run_forecast(),
                "Import CSV" => self.import_products(),
                "Export CSV" => self.export_products(),
                _ => return Ok(()),
            };
            self.handle_outcome(outcome)?;
        }
    }

    fn list_products(&self) {
        print_products(self.store.products(), &self.forecasts);
    }

    fn add_product(&mut self) -> Result<()> {
        let product = self.prompt_product(&Product::draft())?;
        self.store.create(product)?;
        Ok(())
    }

    fn edit_product(&mut self) -> Result<()> {
        let Some(id) = self.pick_product("Edit which product?")? else {
            return Ok(());
        };
        let Some(before) = self.store.get::<Product>(&id).cloned() else {
            return Ok(());
        };

        let after = self.prompt_product(&before)?;
        let patch = product_patch(&before, &after);
        self.store.update::<Product, _>(&id, &patch);
        Ok(())
    }

    fn delete_product(&mut self) -> Result<()> {
        let Some(id) = self.pick_product("Delete which product?")? else {
            return Ok(());
        };
        if self.store.delete::<Product>(&id, &mut confirm_prompt).is_none() {
            println!("{}", "Nothing deleted.".yellow());
        }
        Ok(())
    }

    fn run_forecast(&mut self) -> Result<()> {
        if self.store.products().is_empty() {
            println!("{}", "No products to forecast.".yellow());
            return Ok(());
        }

        self.dispatcher.submit(AssistantRequest::Forecast {
            products: self.store.products().to_vec(),
        });
        println!("{}", "Analyzing demand...".dimmed());

        if self.await_reply(AssistantFeature::Forecast)? {
            self.list_products();
        }
        Ok(())
    }

    fn import_products(&mut self) -> Result<()> {
        let path = Text::new("CSV file to import:").prompt()?;
        let rows = transfer::import_products_file(Path::new(path.trim()))
            .with_context(|| format!("Failed to import {}", path))?;
        let report = self.store.import(rows);
        for (original, assigned) in &report.rekeyed {
            println!("  {} id {} was taken, stored as {}", "!".yellow(), original, assigned);
        }
        Ok(())
    }

    fn export_products(&mut self) -> Result<()> {
        let path = Text::new("Export to:")
            .with_default(INVENTORY_EXPORT_FILE)
            .prompt()?;
        transfer::export_products(self.store.products(), Path::new(path.trim()))
            .with_context(|| format!("Failed to export to {}", path))?;
        println!("{} Inventory written to {}", "✓".green(), path);
        Ok(())
    }

    fn save_config(&mut self) -> Result<()> {
        self.config.save(&self.config_path)?;
        println!(
            "{} Settings saved to {}",
            "✓".green(),
            self.config_path.display()
        );
        Ok(())
    }

    fn pick_product(&self, message: &str) -> Result<Option<String>> {
        let products = self.store.products();
        if products.is_empty() {
            println!("{}", "No products.".yellow());
            return Ok(None);
        }
        let options: Vec<String> = products
            .iter()
            .map(|p| format!("{:<10} {} ({})", p.id, p.name, p.sku))
            .collect();
        let picked = Select::new(message, options).raw_prompt()?;
        Ok(products.get(picked.index).map(|p| p.id.clone()))
    }

    fn prompt_product(&self, base: &Product) -> Result<Product> {
        let mut product = base.clone();
        product.name = self.name_field("Name:", &base.name)?;
        product.category =
            pick_option("Category:", ProductCategory::known().to_vec(), &base.category)?;
        product.sku = self.text_field("SKU:", &base.sku)?;
        product.stock_level = self.count_field("Stock level:", base.stock_level)?;
        product.reorder_point = self.count_field("Reorder point:", base.reorder_point)?;
        product.price = self.amount_field("Price (Rp):", base.price)?;
        product.cost = self.amount_field("Cost (Rp):", base.cost)?;
        product.serial_prefix = self.text_field("Serial prefix:", &base.serial_prefix)?;
        Ok(product)
    }

    // ---- Financials ----

    fn financials(&mut self) -> Result<()> {
        self.view = View::Financials;
        print_transactions(self.store.transactions().iter());

        loop {
            self.deliver_ready()?;
            let Some(action) =
                optional(Select::new("Financials:", FINANCIALS_MENU.to_vec()).prompt())?
            else {
                return Ok(());
            };

            let outcome = match action {
                "List ledger" => {
                    print_transactions(self.store.transactions().iter());
                    Ok(())
                }
                "Add transaction" => self.add_transaction(),
                "Edit transaction" => self.edit_transaction(false),
                "Delete transaction" => self.delete_transaction(false),
                "AI anomaly audit" => self.run_audit(),
                "Import CSV" => self.import_transactions(),
                "Export CSV" => self.export_transactions(),
                _ => return Ok(()),
            };
            self.handle_outcome(outcome)?;
        }
    }

    fn add_transaction(&mut self) -> Result<()> {
        let tx = self.prompt_transaction(&Transaction::draft())?;
        self.store.create(tx)?;
        Ok(())
    }

    fn edit_transaction(&mut self, sales_only: bool) -> Result<()> {
        let Some(id) = self.pick_transaction("Edit which entry?", sales_only)? else {
            return Ok(());
        };
        let Some(before) = self.store.get::<Transaction>(&id).cloned() else {
            return Ok(());
        };

        let after = self.prompt_transaction(&before)?;
        let patch = transaction_patch(&before, &after);
        self.store.update::<Transaction, _>(&id, &patch);
        Ok(())
    }

    fn delete_transaction(&mut self, sales_only: bool) -> Result<()> {
        let Some(id) = self.pick_transaction("Delete which entry?", sales_only)? else {
            return Ok(());
        };
        if self.store.delete::<Transaction>(&id, &mut confirm_prompt).is_none() {
            println!("{}", "Nothing deleted.".yellow());
        }
        Ok(())
    }

    fn run_audit(&mut self) -> Result<()> {
        if self.store.transactions().is_empty() {
            println!("{}", "The ledger is empty.".yellow());
            return Ok(());
        }

        self.dispatcher.submit(AssistantRequest::Audit {
            transactions: self.store.transactions().to_vec(),
        });
        println!("{}", "Auditing the ledger...".dimmed());

        self.await_reply(AssistantFeature::Audit)?;
        Ok(())
    }

    fn import_transactions(&mut self) -> Result<()> {
        let path = Text::new("CSV file to import:").prompt()?;
        let rows = transfer::import_transactions_file(Path::new(path.trim()))
            .with_context(|| format!("Failed to import {}", path))?;
        let report = self.store.import(rows);
        for (original, assigned) in &report.rekeyed {
            println!("  {} id {} was taken, stored as {}", "!".yellow(), original, assigned);
        }
        Ok(())
    }

    fn export_transactions(&mut self) -> Result<()> {
        let path = Text::new("Export to:")
            .with_default(LEDGER_EXPORT_FILE)
            .prompt()?;
        transfer::export_transactions(self.store.transactions(), Path::new(path.trim()))
            .with_context(|| format!("Failed to export to {}", path))?;
        println!("{} Ledger written to {}", "✓".green(), path);
        Ok(())
    }

    fn pick_transaction(&self, message: &str, sales_only: bool) -> Result<Option<String>> {
        let entries: Vec<&Transaction> = if sales_only {
            self.store.sales().collect()
        } else {
            self.store.transactions().iter().collect()
        };
        if entries.is_empty() {
            println!("{}", "No entries.".yellow());
            return Ok(None);
        }
        let options: Vec<String> = entries
            .iter()
            .map(|t| {
                format!(
                    "{:<8} {} {:<8} Rp {} {}",
                    t.id,
                    t.date,
                    t.tx_type,
                    format_amount(t.amount),
                    t.description
                )
            })
            .collect();
        let picked = Select::new(message, options).raw_prompt()?;
        Ok(entries.get(picked.index).map(|t| t.id.clone()))
    }

    fn prompt_transaction(&self, base: &Transaction) -> Result<Transaction> {
        let mut tx = base.clone();
        tx.date = self.text_field("Date (YYYY-MM-DD):", &base.date)?;
        tx.tx_type = pick_option("Type:", TransactionType::known().to_vec(), &base.tx_type)?;
        tx.amount = self.amount_field("Amount (Rp):", base.amount)?;
        tx.status = pick_option("Status:", TransactionStatus::known().to_vec(), &base.status)?;
        tx.description = self.text_field("Description:", &base.description)?;
        Ok(tx)
    }

    // ---- Sales ----

    fn sales(&mut self) -> Result<()> {
        self.view = View::Sales;
        print_transactions(self.store.sales());

        loop {
            self.deliver_ready()?;
            let Some(action) = optional(Select::new("Sales:", SALES_MENU.to_vec()).prompt())? else {
                return Ok(());
            };

            let outcome = match action {
                "Sales history" => {
                    print_transactions(self.store.sales());
                    Ok(())
                }
                "Quick POS sale" => self.quick_sale(),
                "Edit sale" => self.edit_transaction(true),
                "Delete sale" => self.delete_transaction(true),
                _ => return Ok(()),
            };
            self.handle_outcome(outcome)?;
        }
    }

    /// Ring up a sale of one product; stock levels are not touched
    fn quick_sale(&mut self) -> Result<()> {
        let Some(id) = self.pick_product("Product sold:")? else {
            return Ok(());
        };
        let Some(product) = self.store.get::<Product>(&id).cloned() else {
            return Ok(());
        };

        let quantity = self.count_field("Quantity:", 1)?;
        if quantity == 0 {
            println!("{}", "Nothing sold.".yellow());
            return Ok(());
        }
        let amount = product.price * quantity as f64;
        let description = format!("POS sale: {}x {}", quantity, product.name);
        self.store.record_sale(amount, description)?;
        Ok(())
    }

    // ---- Assistant ----

    fn assistant(&mut self) -> Result<()> {
        println!(
            "{} (context: {} view)",
            "NexAI assistant".bold().cyan(),
            self.view
        );

        loop {
            self.deliver_ready()?;
            let microphone = if self.speech.is_speaking() {
                "Stop speaking"
            } else {
                "Microphone"
            };
            let mut options = vec!["Type a question", microphone];
            if self.last_answer.is_some() {
                options.push("Read last answer again");
            }
            options.push("Back");

            let action = optional(Select::new("Assistant:", options).prompt())?;
            if action != Some(microphone) {
                // Moving on ends the answer being read
                self.speech.backend_mut().finish_reading();
                self.pump_speech();
            }

            let outcome = match action {
                Some("Type a question") => self.typed_question(),
                Some("Microphone") | Some("Stop speaking") => self.microphone(),
                Some("Read last answer again") => self.replay_answer(),
                _ => return Ok(()),
            };
            self.handle_outcome(outcome)?;
        }
    }

    fn typed_question(&mut self) -> Result<()> {
        let query = Text::new("Ask NexAI:").prompt()?;
        if query.trim().is_empty() {
            return Ok(());
        }
        self.submit_query(query.trim())
    }

    fn microphone(&mut self) -> Result<()> {
        match self.speech.activate() {
            Ok(Activation::StartedListening) => self.pump_speech_and_submit(),
            Ok(Activation::StoppedSpeaking) | Ok(Activation::AlreadyListening) => Ok(()),
            Err(SpeechError::RecognitionUnavailable) => {
                println!(
                    "{}",
                    "Voice input is not available. Start with --voice to enable it.".yellow()
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn replay_answer(&mut self) -> Result<()> {
        if let Some(answer) = self.last_answer.clone() {
            self.speech.speak(&answer)?;
        }
        Ok(())
    }

    /// Feed backend events into the controller, submitting recognized queries
    fn pump_speech_and_submit(&mut self) -> Result<()> {
        for query in self.pump_speech() {
            self.submit_query(&query)?;
        }
        Ok(())
    }

    fn pump_speech(&mut self) -> Vec<String> {
        let events = self.speech.backend_mut().drain_events();
        events
            .into_iter()
            .filter_map(|event| self.speech.handle_event(event))
            .map(|action| match action {
                SpeechAction::SubmitQuery(query) => query,
            })
            .collect()
    }

    fn submit_query(&mut self, query: &str) -> Result<()> {
        println!("{} {}", "You:".bold(), query);
        let digest = summarize(&self.store, self.view, &self.config.summary_options());
        self.dispatcher.submit(AssistantRequest::Chat {
            query: query.to_string(),
            digest: digest.to_string(),
        });
        println!("{}", "Thinking...".dimmed());

        self.await_reply(AssistantFeature::Chat)?;
        Ok(())
    }

    // ---- Form fields ----

    fn text_field(&self, label: &str, current: &str) -> Result<String> {
        let value = Text::new(label).with_default(current).prompt()?;
        Ok(form_text(&value, self.voice_input))
    }

    /// Like `text_field`, but blank entries are refused
    fn name_field(&self, label: &str, current: &str) -> Result<String> {
        let voice_input = self.voice_input;
        let value = Text::new(label)
            .with_default(current)
            .with_validator(move |value: &str| Ok(required_text(value, voice_input)))
            .prompt()?;
        Ok(form_text(&value, voice_input))
    }

    fn count_field(&self, label: &str, current: u32) -> Result<u32> {
        if self.voice_input {
            let spoken = Text::new(label)
                .with_help_message("Say a number; leave empty to keep the current value")
                .with_placeholder(&current.to_string())
                .prompt()?;
            return Ok(dictation_number(&spoken)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(current));
        }
        Ok(CustomType::<u32>::new(label)
            .with_default(current)
            .with_error_message("Please enter a whole number")
            .prompt()?)
    }

    fn amount_field(&self, label: &str, current: f64) -> Result<f64> {
        if self.voice_input {
            let spoken = Text::new(label)
                .with_help_message("Say an amount; leave empty to keep the current value")
                .with_placeholder(&format_amount(current))
                .prompt()?;
            return Ok(dictation_number(&spoken)
                .map(|n| n as f64)
                .unwrap_or(current));
        }
        Ok(CustomType::<f64>::new(label)
            .with_default(current)
            .with_error_message("Please enter a number")
            .with_validator(|value: &f64| {
                if *value >= 0.0 {
                    Ok(Validation::Valid)
                } else {
                    Ok(Validation::Invalid("Must not be negative".into()))
                }
            })
            .prompt()?)
    }
}

/// A form entry as stored: trimmed, or cleaned of dictation punctuation
fn form_text(value: &str, voice_input: bool) -> String {
    if voice_input {
        dictation_text(value)
    } else {
        value.trim().to_string()
    }
}

fn required_text(value: &str, voice_input: bool) -> Validation {
    if form_text(value, voice_input).is_empty() {
        Validation::Invalid("A name is required".into())
    } else {
        Validation::Valid
    }
}

/// Blocking yes/no question used for deletions
fn confirm_prompt(message: &str) -> bool {
    inquire::Confirm::new(message)
        .with_default(false)
        .prompt()
        .unwrap_or(false)
}

fn optional<T>(result: Result<T, InquireError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn is_cancel(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<InquireError>(),
        Some(InquireError::OperationCanceled)
    )
}

/// Select among the known values, keeping an unrecognized current value selectable
fn pick_option<T>(message: &str, mut options: Vec<T>, current: &T) -> Result<T>
where
    T: Clone + PartialEq + std::fmt::Display,
{
    if !options.contains(current) {
        options.push(current.clone());
    }
    let cursor = options.iter().position(|o| o == current).unwrap_or(0);
    Ok(Select::new(message, options)
        .with_starting_cursor(cursor)
        .prompt()?)
}

fn changed<T: PartialEq + Clone>(before: &T, after: &T) -> Option<T> {
    (before != after).then(|| after.clone())
}

/// Patch holding only the fields the user changed
fn product_patch(before: &Product, after: &Product) -> ProductPatch {
    ProductPatch {
        name: changed(&before.name, &after.name),
        category: changed(&before.category, &after.category),
        sku: changed(&before.sku, &after.sku),
        stock_level: changed(&before.stock_level, &after.stock_level),
        reorder_point: changed(&before.reorder_point, &after.reorder_point),
        price: changed(&before.price, &after.price),
        cost: changed(&before.cost, &after.cost),
        image_url: changed(&before.image_url, &after.image_url),
        serial_prefix: changed(&before.serial_prefix, &after.serial_prefix),
    }
}

fn transaction_patch(before: &Transaction, after: &Transaction) -> TransactionPatch {
    TransactionPatch {
        date: changed(&before.date, &after.date),
        tx_type: changed(&before.tx_type, &after.tx_type),
        amount: changed(&before.amount, &after.amount),
        status: changed(&before.status, &after.status),
        description: changed(&before.description, &after.description),
    }
}

fn status_label(status: &TransactionStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        TransactionStatus::Completed => text.green(),
        TransactionStatus::Pending => text.yellow(),
        TransactionStatus::Flagged => text.red(),
        TransactionStatus::Other(_) => text.normal(),
    }
}

/// Per-unit margin, red when the product sells at a loss
fn margin_label(product: &Product) -> ColoredString {
    let margin = product.margin();
    let text = format_amount(margin);
    if margin < 0.0 {
        text.red()
    } else {
        text.normal()
    }
}

pub fn print_products(products: &[Product], forecasts: &[AiForecastResult]) {
    if products.is_empty() {
        println!("{}", "No products found.".yellow());
        return;
    }

    println!(
        "{:<10} | {:<22} | {:<10} | {:<12} | {:>5} | {:>7} | {:>12} | {:>12} | {:<8} | {:>8}",
        "ID",
        "Name",
        "Category",
        "SKU",
        "Stock",
        "Reorder",
        "Price",
        "Margin",
        "Serial",
        "Forecast"
    );
    println!("{}", "-".repeat(135));

    for product in products {
        let stock = product.stock_level.to_string();
        let stock = if product.is_low_stock() {
            stock.red()
        } else {
            stock.normal()
        };
        let forecast = forecast_for(forecasts, product)
            .map(|f| format!("{:.0}", f.predicted_demand))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<10} | {:<22} | {:<10} | {:<12} | {:>5} | {:>7} | {:>12} | {:>12} | {:<8} | {:>8}",
            product.id,
            product.name,
            product.category,
            product.sku,
            stock,
            product.reorder_point,
            format_amount(product.price),
            margin_label(product),
            product.serial_prefix,
            forecast
        );
    }

    for product in products {
        if let Some(f) = forecast_for(forecasts, product) {
            println!(
                "  {} {}: {} ({:.0}% confidence)",
                "›".cyan(),
                product.name,
                f.reasoning,
                f.confidence_score
            );
        }
    }
}

pub fn print_transactions<'a>(transactions: impl Iterator<Item = &'a Transaction>) {
    let mut any = false;
    for tx in transactions {
        if !any {
            println!(
                "{:<8} | {:<10} | {:<9} | {:>14} | {:<9} | {:<40}",
                "ID", "Date", "Type", "Amount", "Status", "Description"
            );
            println!("{}", "-".repeat(100));
            any = true;
        }
        let amount = format_amount(tx.amount);
        let amount = if tx.tx_type.is_outflow() {
            amount.red()
        } else {
            amount.green()
        };
        println!(
            "{:<8} | {:<10} | {:<9} | {:>14} | {:<9} | {:<40}",
            tx.id,
            tx.date,
            tx.tx_type,
            amount,
            status_label(&tx.status),
            tx.description
        );
    }
    if !any {
        println!("{}", "No transactions found.".yellow());
    }
}

pub fn print_anomalies(results: &[AiAnomalyResult]) {
    if results.is_empty() {
        println!("{}", "No audit result available right now.".yellow());
        return;
    }

    let suspicious = flagged(results);
    if suspicious.is_empty() {
        println!("{}", "No anomalies found.".green());
        return;
    }
    println!("{}", "Flagged entries:".red().bold());
    for result in suspicious {
        println!(
            "  {:<8} risk {:>3.0}  {}",
            result.transaction_id, result.risk_score, result.explanation
        );
    }
}
