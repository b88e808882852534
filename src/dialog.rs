//! The dialog controller.
//!
//! A dialog is a linear request/response conversation with one bank
//! endpoint. The controller owns its context exclusively: message counter,
//! dialog id, and the parameter snapshots all live on the instance, and
//! `&mut self` on every send enforces at most one in-flight request.
//!
//! State diagram:
//! ```text
//!           Start ── sync ──► Syncing ── ok ──► Ready ──┐
//!                                │                 │    │ business txn
//!                                ▼ 9xxx / codec    ▼    │
//!                             Failed             Ended ◄┘  (end)
//! ```
//! Terminal states: `Ended`, `Failed`.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::domain::{
    AccountConnection, AccountInformation, AckClass, Acknowledgement, BankId,
    BankParameterData, KeyName, Language, PublicKey, Timeframe, UserParameterData,
    ANONYMOUS_CLIENT_ID,
};
use crate::error::{Error, Result};
use crate::message::bank::finalize;
use crate::message::{BankMessage, BodySegment, ClientMessage};
use crate::security::{CryptoProvider, SignatureProvider};
use crate::segment::account::{BalanceRequest, BalanceResponse, TransactionsRequest};
use crate::segment::dialog::{
    DialogEnd, DialogIdentification, ProcessingPreparation, SyncMode, Synchronisation,
};
use crate::segment::key_management::{PublicKeyRequest, PublicKeyRevocation};
use crate::segment::registry::BankSegment;
use crate::segment::DEFAULT_HBCI_VERSION;
use crate::swift::{mt940, mt942};

/// Dialog id before the bank assigns one.
pub const INITIAL_DIALOG_ID: &str = "0";
/// Client system id before the bank assigns one.
pub const INITIAL_CLIENT_SYSTEM_ID: &str = "0";

/// Lifecycle states of a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Start,
    Syncing,
    Ready,
    Ended,
    Failed,
}

impl DialogState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DialogState::Ended | DialogState::Failed)
    }

    fn valid_transitions(self) -> &'static [DialogState] {
        use DialogState::*;
        match self {
            Start => &[Syncing],
            Syncing => &[Ready, Failed],
            Ready => &[Ready, Ended, Failed],
            Ended => &[],
            Failed => &[],
        }
    }

    fn can_transition_to(self, next: DialogState) -> bool {
        self.valid_transitions().contains(&next)
    }

    fn name(self) -> &'static str {
        match self {
            DialogState::Start => "start",
            DialogState::Syncing => "syncing",
            DialogState::Ready => "ready",
            DialogState::Ended => "ended",
            DialogState::Failed => "failed",
        }
    }
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A business-transaction result with the warnings the bank attached.
#[derive(Debug, Clone)]
pub struct JobResult<T> {
    pub value: T,
    pub warnings: Vec<Acknowledgement>,
}

/// Booked statements and unbooked interim reports of one HKKAZ exchange.
#[derive(Debug, Clone)]
pub struct AccountTransactions {
    pub statements: Vec<mt940::Statement>,
    pub interim_reports: Vec<mt942::InterimReport>,
}

/// The dialog controller. See the module docs for the state machine.
pub struct Dialog {
    transport: Box<dyn crate::transport::Transport>,
    signer: Box<dyn SignatureProvider>,
    crypter: Box<dyn CryptoProvider>,
    state: DialogState,
    bank_id: BankId,
    client_id: String,
    client_system_id: String,
    language: Language,
    hbci_version: u16,
    dialog_id: String,
    message_count: u32,
    timeout: Duration,
    anonymous: bool,
    product_name: String,
    product_version: String,
    bank_parameter_data: BankParameterData,
    user_parameter_data: UserParameterData,
    accounts: Vec<AccountInformation>,
}

impl Dialog {
    /// An authenticated dialog. The providers carry the credentials; the
    /// controller never sees the PIN.
    pub fn new(
        transport: Box<dyn crate::transport::Transport>,
        signer: Box<dyn SignatureProvider>,
        crypter: Box<dyn CryptoProvider>,
        bank_id: BankId,
        client_id: impl Into<String>,
    ) -> Self {
        Dialog {
            transport,
            signer,
            crypter,
            state: DialogState::Start,
            bank_id,
            client_id: client_id.into(),
            client_system_id: INITIAL_CLIENT_SYSTEM_ID.to_owned(),
            language: Language::German,
            hbci_version: DEFAULT_HBCI_VERSION,
            dialog_id: INITIAL_DIALOG_ID.to_owned(),
            message_count: 0,
            timeout: Duration::from_secs(30),
            anonymous: false,
            product_name: "hbci-rs".to_owned(),
            product_version: "0.1".to_owned(),
            bank_parameter_data: BankParameterData::default(),
            user_parameter_data: UserParameterData::default(),
            accounts: Vec::new(),
        }
    }

    /// An anonymous dialog: client id `9999999999`, messages sent without
    /// the signature and encryption envelopes.
    pub fn anonymous(
        transport: Box<dyn crate::transport::Transport>,
        signer: Box<dyn SignatureProvider>,
        crypter: Box<dyn CryptoProvider>,
        bank_id: BankId,
    ) -> Self {
        let mut dialog = Dialog::new(transport, signer, crypter, bank_id, ANONYMOUS_CLIENT_ID);
        dialog.anonymous = true;
        dialog
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn dialog_id(&self) -> &str {
        &self.dialog_id
    }

    pub fn client_system_id(&self) -> &str {
        &self.client_system_id
    }

    pub fn bank_parameter_data(&self) -> &BankParameterData {
        &self.bank_parameter_data
    }

    pub fn user_parameter_data(&self) -> &UserParameterData {
        &self.user_parameter_data
    }

    pub fn accounts(&self) -> &[AccountInformation] {
        &self.accounts
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn set_product(&mut self, name: &str, version: &str) {
        self.product_name = name.to_owned();
        self.product_version = version.to_owned();
    }

    fn transition(&mut self, next: DialogState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            error!(from = %self.state, to = %next, "illegal dialog transition");
            return Err(Error::DialogState {
                state: self.state.name(),
            });
        }
        if self.state != next {
            info!(from = %self.state, to = %next, dialog_id = %self.dialog_id, "dialog transition");
        }
        self.state = next;
        Ok(())
    }

    fn next_message_number(&mut self) -> u32 {
        self.message_count += 1;
        self.message_count
    }

    /// Sends one message and decodes the reply. Transport and codec
    /// failures drive the dialog to `Failed`.
    async fn exchange(&mut self, body: Vec<BodySegment>) -> Result<BankMessage> {
        let message_number = self.next_message_number();
        let mut message = ClientMessage::new(
            self.hbci_version,
            &self.dialog_id,
            message_number,
            body,
        )?;
        let wire = if self.anonymous {
            message.marshal()
        } else {
            finalize(&mut message, self.signer.as_ref(), self.crypter.as_ref())?
        };

        let reply = match self.transport.round_trip(&wire, self.timeout).await {
            Ok(reply) => reply,
            Err(cause) => {
                self.state = DialogState::Failed;
                error!(%cause, "transport failed, dialog unusable");
                return Err(Error::Transport(cause));
            }
        };
        match BankMessage::parse(&reply, Some(self.crypter.as_ref())) {
            Ok(parsed) => Ok(parsed),
            Err(cause) => {
                self.state = DialogState::Failed;
                error!(%cause, "response could not be decoded, dialog unusable");
                Err(cause)
            }
        }
    }

    fn warnings_of(response: &BankMessage) -> Vec<Acknowledgement> {
        response
            .acknowledgements()
            .into_iter()
            .filter(|a| a.is_warning())
            .cloned()
            .collect()
    }

    /// Initializes the dialog: synchronisation plus identification.
    ///
    /// On a 0xxx/3xxx outcome the assigned dialog id, client system id,
    /// and the BPD/UPD/account snapshots are stored and the dialog becomes
    /// `Ready`. A 9xxx outcome is `DialogInitFailed`; retrying is the
    /// caller's decision, on a fresh dialog.
    pub async fn sync(&mut self) -> Result<()> {
        self.transition(DialogState::Syncing)?;
        let body: Vec<BodySegment> = vec![
            Box::new(DialogIdentification::new(
                self.bank_id.clone(),
                self.client_id.clone(),
                self.client_system_id.clone(),
                true,
            )?),
            Box::new(ProcessingPreparation::new(
                self.bank_parameter_data.version,
                self.user_parameter_data.version,
                self.language,
                &self.product_name,
                &self.product_version,
            )?),
            Box::new(Synchronisation::new(SyncMode::NewClientSystemId)),
        ];
        let response = self.exchange(body).await?;

        if response.has_error() {
            self.state = DialogState::Failed;
            let ack = response.first_error().expect("error outcome has an entry");
            warn!(code = ack.code, text = %ack.text, "dialog initialization rejected");
            return Err(Error::DialogInitFailed {
                code: ack.code,
                text: ack.text.clone(),
            });
        }

        if let Some(header) = response.message_header() {
            self.dialog_id = header.dialog_id.clone();
        }
        if let Some(sync) = response.sync_response() {
            self.client_system_id = sync.client_system_id.clone();
            self.signer.set_client_system_id(&self.client_system_id);
            self.crypter.set_client_system_id(&self.client_system_id);
        }
        if let Some(bpd) = response.bank_parameter_data() {
            self.bank_parameter_data = bpd.clone();
        }
        if let Some(upd) = response.user_parameter_data() {
            self.user_parameter_data = upd.clone();
        }
        self.accounts = response.accounts().cloned().collect();

        self.transition(DialogState::Ready)?;
        info!(
            dialog_id = %self.dialog_id,
            client_system_id = %self.client_system_id,
            accounts = self.accounts.len(),
            "dialog ready"
        );
        Ok(())
    }

    fn require_ready(&self) -> Result<()> {
        if self.state != DialogState::Ready {
            return Err(Error::DialogState {
                state: self.state.name(),
            });
        }
        Ok(())
    }

    /// Runs one business-transaction message while `Ready`. 9xxx outcomes
    /// fail the job; 3xxx entries are returned to the caller next to the
    /// decoded response.
    pub async fn execute(
        &mut self,
        body: Vec<BodySegment>,
    ) -> Result<JobResult<BankMessage>> {
        self.require_ready()?;
        let response = self.exchange(body).await?;
        if let Some(ack) = response.first_error() {
            return Err(Error::Bank {
                code: ack.code,
                text: ack.text.clone(),
            });
        }
        if response.outcome() == Some(AckClass::Warning) {
            for ack in response.acknowledgements().iter().filter(|a| a.is_warning()) {
                warn!(code = ack.code, text = %ack.text, "bank warning");
            }
        }
        let warnings = Self::warnings_of(&response);
        Ok(JobResult {
            value: response,
            warnings,
        })
    }

    /// Fetches the balances the bank reports for one account.
    pub async fn balances(
        &mut self,
        account: &AccountConnection,
    ) -> Result<JobResult<Vec<BalanceResponse>>> {
        let body: Vec<BodySegment> =
            vec![Box::new(BalanceRequest::new(account.clone(), false))];
        let result = self.execute(body).await?;
        let balances = result.value.balances().cloned().collect();
        Ok(JobResult {
            value: balances,
            warnings: result.warnings,
        })
    }

    /// Fetches booked and unbooked transactions for one account, decoding
    /// the embedded MT940/MT942 blobs.
    pub async fn transactions(
        &mut self,
        account: &AccountConnection,
        timeframe: Option<Timeframe>,
    ) -> Result<JobResult<AccountTransactions>> {
        let body: Vec<BodySegment> = vec![Box::new(TransactionsRequest::new(
            account.clone(),
            false,
            timeframe,
        ))];
        let result = self.execute(body).await?;
        let mut statements = Vec::new();
        let mut interim_reports = Vec::new();
        for response in result.value.transactions() {
            statements.extend(mt940::parse_statements(&response.booked)?);
            if let Some(unbooked) = &response.unbooked {
                interim_reports.extend(mt942::parse_reports(unbooked)?);
            }
        }
        Ok(JobResult {
            value: AccountTransactions {
                statements,
                interim_reports,
            },
            warnings: result.warnings,
        })
    }

    /// Requests the bank's public key for `key_name` (RDH key management).
    pub async fn fetch_public_keys(
        &mut self,
        key_name: KeyName,
    ) -> Result<JobResult<Vec<(KeyName, PublicKey)>>> {
        let body: Vec<BodySegment> = vec![Box::new(PublicKeyRequest::new(key_name))];
        let result = self.execute(body).await?;
        let keys = result
            .value
            .segments
            .iter()
            .filter_map(|s| match s {
                BankSegment::KeyTransmission(t) => {
                    Some((t.key_name.clone(), t.public_key.clone()))
                }
                _ => None,
            })
            .collect();
        Ok(JobResult {
            value: keys,
            warnings: result.warnings,
        })
    }

    /// Revokes a key at the bank (RDH key management).
    pub async fn revoke_key(
        &mut self,
        key_name: KeyName,
        reason: &str,
    ) -> Result<JobResult<BankMessage>> {
        let now = chrono::Utc::now().naive_utc();
        let body: Vec<BodySegment> = vec![Box::new(PublicKeyRevocation::new(
            key_name,
            reason,
            now.date(),
            now.time(),
        )?)];
        self.execute(body).await
    }

    /// Terminates the dialog. Whatever the bank answers, the dialog is
    /// closed afterwards and accepts no further messages.
    pub async fn end(&mut self) -> Result<()> {
        self.require_ready()?;
        let body: Vec<BodySegment> = vec![Box::new(DialogEnd::new(self.dialog_id.clone())?)];
        let response = self.exchange(body).await?;
        if let Some(class) = response.outcome() {
            info!(dialog_id = %self.dialog_id, outcome = ?class, "dialog ended");
        }
        self.transition(DialogState::Ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{PinTanCryptoProvider, PinTanSignatureProvider};
    use crate::transport::{Transport, TransportError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Replays a scripted list of responses and records the requests.
    struct ScriptedTransport {
        replies: Mutex<Vec<Vec<u8>>>,
        requests: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl ScriptedTransport {
        fn new(mut replies: Vec<&[u8]>) -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
            replies.reverse();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let transport = ScriptedTransport {
                replies: Mutex::new(replies.into_iter().map(<[u8]>::to_vec).collect()),
                requests: Arc::clone(&requests),
            };
            (transport, requests)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn round_trip(
            &self,
            payload: &[u8],
            _deadline: Duration,
        ) -> std::result::Result<Vec<u8>, TransportError> {
            self.requests.lock().unwrap().push(payload.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| TransportError::Network("no scripted reply left".into()))
        }
    }

    fn bank() -> BankId {
        BankId::new(280, "10090000").unwrap()
    }

    fn dialog_with(replies: Vec<&[u8]>) -> (Dialog, Arc<Mutex<Vec<Vec<u8>>>>) {
        let (transport, requests) = ScriptedTransport::new(replies);
        let signer = Box::new(PinTanSignatureProvider::new(bank(), "user1", "secret"));
        let crypter = Box::new(PinTanCryptoProvider::new(bank(), "user1"));
        (
            Dialog::new(Box::new(transport), signer, crypter, bank(), "user1"),
            requests,
        )
    }

    const SYNC_OK: &[u8] = b"HNHBK:1:3+000000000220+220+82410923+1+82410923:1'\
HIRMG:2:2+0010::Nachricht entgegengenommen.'\
HISYN:3:3:5+fenway29'\
HIBPA:4:2:5+12+280:10090000+Testbank+3+1+220'\
HIUPA:5:2:5+user1+4+0'\
HIUPD:6:4:5+1234567890::280:10090000+user1+EUR+MUSTERMANN'\
HNHBS:7:1+1'";

    const END_OK: &[u8] = b"HNHBK:1:3+000000000100+220+82410923+2+82410923:2'\
HIRMG:2:2+0010::Dialog beendet.'\
HNHBS:3:1+2'";

    const SYNC_FAIL: &[u8] = b"HNHBK:1:3+000000000120+220+0+1+0:1'\
HIRMG:2:2+9800::Dialog abgebrochen.'\
HNHBS:3:1+1'";

    #[tokio::test]
    async fn sync_stores_context_and_reaches_ready() {
        let (mut dialog, _) = dialog_with(vec![SYNC_OK]);
        assert_eq!(dialog.state(), DialogState::Start);
        dialog.sync().await.unwrap();
        assert_eq!(dialog.state(), DialogState::Ready);
        assert_eq!(dialog.dialog_id(), "82410923");
        assert_eq!(dialog.client_system_id(), "fenway29");
        assert_eq!(dialog.bank_parameter_data().version, 12);
        assert_eq!(dialog.user_parameter_data().version, 4);
        assert_eq!(dialog.accounts().len(), 1);
        assert_eq!(dialog.accounts()[0].name1, "MUSTERMANN");
    }

    #[tokio::test]
    async fn sync_failure_is_dialog_init_failed() {
        let (mut dialog, _) = dialog_with(vec![SYNC_FAIL]);
        let err = dialog.sync().await.unwrap_err();
        match err {
            Error::DialogInitFailed { code, .. } => assert_eq!(code, 9800),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(dialog.state(), DialogState::Failed);
        // A failed dialog accepts no further messages.
        assert!(dialog.end().await.is_err());
    }

    #[tokio::test]
    async fn message_numbers_are_monotonic() {
        let (mut dialog, _) = dialog_with(vec![SYNC_OK, END_OK]);
        dialog.sync().await.unwrap();
        dialog.end().await.unwrap();
        assert_eq!(dialog.state(), DialogState::Ended);
        assert_eq!(dialog.message_count, 2);
    }

    #[tokio::test]
    async fn end_sends_stored_dialog_id() {
        let (mut dialog, requests) = dialog_with(vec![SYNC_OK, END_OK]);
        dialog.sync().await.unwrap();
        dialog.end().await.unwrap();
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let end_request = String::from_utf8_lossy(&requests[1]);
        assert!(end_request.contains("HKEND:3:1+82410923'"), "{end_request}");
    }

    #[tokio::test]
    async fn transport_failure_drives_failed() {
        let (mut dialog, _) = dialog_with(vec![]);
        let err = dialog.sync().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(dialog.state(), DialogState::Failed);
    }

    #[tokio::test]
    async fn business_transaction_requires_ready() {
        let (mut dialog, _) = dialog_with(vec![]);
        let account = AccountConnection {
            account_id: "1234567890".into(),
            sub_account_characteristics: String::new(),
            country_code: 280,
            bank_id: "10090000".into(),
        };
        let err = dialog.balances(&account).await.unwrap_err();
        assert!(matches!(err, Error::DialogState { .. }));
    }
}
