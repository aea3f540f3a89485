use async_trait::async_trait;

/// A command or query, answered with `Res`.
pub trait Request<Res> {}

/// Handles one kind of [`Request`].
#[async_trait]
pub trait RequestHandler<Req, Res>
where
    Req: Request<Res> + Send,
{
    /// Handle a request and returns the response.
    async fn handle(&mut self, req: Req) -> Res;
}
