//! Operation step: one remote call, translated and classified

use crate::classify::{ClassifiedError, ErrorClassifier};
use crate::context::Stage;
use crate::port::ServiceClient;
use crate::translate::{Observation, Translator};
use tracing::Instrument;

/// Runs a single request through the service client
///
/// The step never touches the context. It returns the translated
/// observation, or the classified error when the call fails.
pub struct OperationStep<'a, T, C> {
    translator: &'a T,
    client: &'a C,
    classifier: &'a ErrorClassifier,
}

impl<'a, T, C> OperationStep<'a, T, C>
where
    T: Translator,
    C: ServiceClient<Request = T::Request, Response = T::Response>,
{
    pub fn new(translator: &'a T, client: &'a C, classifier: &'a ErrorClassifier) -> Self {
        Self {
            translator,
            client,
            classifier,
        }
    }

    pub async fn run(
        &self,
        stage: Stage,
        request: T::Request,
    ) -> Result<Observation<T::Observed>, ClassifiedError> {
        let span = tracing::debug_span!(
            "step",
            client = self.client.name(),
            resource_type = self.translator.resource_type(),
            %stage,
        );

        match self.client.invoke(request).instrument(span).await {
            Ok(response) => {
                tracing::debug!("{} call for {} succeeded", stage, self.translator.resource_type());
                Ok(self.translator.from_response(response))
            }
            Err(error) => {
                let classified = self.classifier.classify(&error);
                tracing::debug!(
                    code = %error.code,
                    kind = %classified.kind,
                    "{} call for {} failed",
                    stage,
                    self.translator.resource_type()
                );
                Err(classified)
            }
        }
    }
}
