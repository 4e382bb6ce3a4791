use super::core::Surface;

/// Capability over a hosting region: id lookup and containment.
pub trait SurfaceHost {
    fn find_by_id(&self, id: &str) -> Option<Surface>;

    /// True when `candidate` sits inside this host's root surface.
    fn contains(&self, candidate: &Surface) -> bool;
}

/// Walk `candidate`'s ancestry looking for `root`.
///
/// The walk is a plain loop with no depth bound.
pub fn is_descendant(root: &Surface, candidate: &Surface) -> bool {
    candidate.is_descendant_of(root)
}

/// Host bound to one fixed root surface.
#[derive(Debug, Clone)]
pub struct RootSurfaceHost {
    root: Surface,
}

impl RootSurfaceHost {
    pub fn new(root: Surface) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Surface {
        &self.root
    }
}

impl SurfaceHost for RootSurfaceHost {
    fn find_by_id(&self, id: &str) -> Option<Surface> {
        self.root.find_by_id(id)
    }

    fn contains(&self, candidate: &Surface) -> bool {
        is_descendant(&self.root, candidate)
    }
}

/// Host whose root is resolved on every query.
///
/// Used when the root does not exist yet at the time the host is handed out,
/// such as a controller's owned surface created in its `on_create` hook.
/// While the provider yields nothing, lookups fail and nothing is contained.
pub struct ProviderSurfaceHost<F>
where
    F: Fn() -> Option<Surface>,
{
    provider: F,
}

impl<F> ProviderSurfaceHost<F>
where
    F: Fn() -> Option<Surface>,
{
    pub fn new(provider: F) -> Self {
        Self { provider }
    }
}

impl<F> SurfaceHost for ProviderSurfaceHost<F>
where
    F: Fn() -> Option<Surface>,
{
    fn find_by_id(&self, id: &str) -> Option<Surface> {
        (self.provider)().and_then(|root| root.find_by_id(id))
    }

    fn contains(&self, candidate: &Surface) -> bool {
        (self.provider)()
            .map(|root| is_descendant(&root, candidate))
            .unwrap_or(false)
    }
}
