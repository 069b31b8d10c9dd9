//! Localized SMS texts
//!
//! Messages are Fluent resources, one per tenant language. A bundle is
//! built for each render, so the catalog holds no state and can be
//! shared freely across tasks.

use fluent::{FluentArgs, FluentBundle, FluentResource};
use unic_langid::{langid, LanguageIdentifier};

use core_kernel::PortError;
use domain_party::Language;

const EN: &str = r#"
bill-generated =
    MeterProof: Your electricity bill for { $month } is generated.
    Amount: ₹{ $amount }
    View bill: { $link }
payment-received =
    MeterProof: Payment of ₹{ $amount } for your { $month } electricity bill has been received. Thank you!
"#;

const MR: &str = r#"
bill-generated =
    MeterProof: तुमचे { $month } चे वीज बिल तयार झाले आहे.
    रक्कम: ₹{ $amount }
    बिल पाहा: { $link }
payment-received =
    MeterProof: तुमच्या { $month } च्या वीज बिलाचे ₹{ $amount } पेमेंट मिळाले आहे. धन्यवाद!
"#;

/// Message identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    BillGenerated,
    PaymentReceived,
}

impl MessageKey {
    fn id(&self) -> &'static str {
        match self {
            MessageKey::BillGenerated => "bill-generated",
            MessageKey::PaymentReceived => "payment-received",
        }
    }
}

/// SMS message catalog for every supported language
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog;

impl MessageCatalog {
    pub fn new() -> Self {
        Self
    }

    /// "Bill generated" text with a link to the public bill view
    pub fn bill_generated(
        &self,
        language: Language,
        month: &str,
        amount: &str,
        link: &str,
    ) -> Result<String, PortError> {
        let mut args = FluentArgs::new();
        args.set("month", month.to_string());
        args.set("amount", amount.to_string());
        args.set("link", link.to_string());
        self.render(language, MessageKey::BillGenerated, &args)
    }

    /// "Payment received" text
    pub fn payment_received(&self, language: Language, month: &str, amount: &str) -> Result<String, PortError> {
        let mut args = FluentArgs::new();
        args.set("month", month.to_string());
        args.set("amount", amount.to_string());
        self.render(language, MessageKey::PaymentReceived, &args)
    }

    /// Formats a message in the given language
    pub fn render(&self, language: Language, key: MessageKey, args: &FluentArgs<'_>) -> Result<String, PortError> {
        let (locale, source): (LanguageIdentifier, &str) = match language {
            Language::En => (langid!("en"), EN),
            Language::Mr => (langid!("mr"), MR),
        };

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| PortError::internal(format!("message catalog {locale}: {errors:?}")))?;
        let mut bundle = FluentBundle::new(vec![locale]);
        // Bidi isolation marks would show up as garbage in SMS clients.
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| PortError::internal(format!("message catalog: {errors:?}")))?;

        let pattern = bundle
            .get_message(key.id())
            .and_then(|message| message.value())
            .ok_or_else(|| PortError::internal(format!("missing message {}", key.id())))?;

        let mut errors = Vec::new();
        let text = bundle.format_pattern(pattern, Some(args), &mut errors);
        if !errors.is_empty() {
            return Err(PortError::internal(format!("message {}: {errors:?}", key.id())));
        }
        Ok(text.into_owned())
    }
}
